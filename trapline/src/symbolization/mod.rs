//! # Symbol Resolution and Address Translation
//!
//! This module turns the raw byte offsets a runtime reports in traps and
//! stack frames into human-readable source context: function name, file
//! path, line and column.
//!
//! ## Pipeline
//!
//! ```text
//! module bytes ──▶ wasm::scan_module ──▶ .debug_* section slices
//!                                             │
//!                        dwarf::info (units, functions)
//!                        dwarf::line (address→line rows)
//!                                             │
//!                                             ▼
//!                                   SourceMap (merged index)
//!                                             │
//!                              resolve(addr) per stack frame
//! ```
//!
//! Building the [`SourceMap`] is a one-shot, synchronous pass at module load
//! time. The result is immutable: resolution is two binary searches over
//! sorted tables, safe to run from any number of threads at once.
//!
//! ## Partial answers by design
//!
//! Debug info is frequently incomplete — stripped units, truncated line
//! programs, nameless ranges. Every lookup degrades instead of failing:
//! a location without a function name, a function without a location, or
//! `None` when nothing covers the address (the normal case for
//! runtime-generated trampolines).
//!
//! ## Module Structure
//!
//! - **`index`**: the merged address index and `resolve` entry point
//! - **`demangle`**: best-effort Rust symbol demangling, raw-name fallback
//! - **`paths`**: DWARF directory/file joining and separator normalization

pub mod demangle;
pub mod index;
pub mod paths;

pub use demangle::demangle;
pub use index::{Location, Resolution, SourceMap};

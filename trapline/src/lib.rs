//! # trapline - DWARF Source Resolution for WebAssembly Modules
//!
//! trapline maps machine-code offsets inside a compiled wasm module back to
//! their original source: file, line, column, and (demangled) function name.
//! Runtimes use it to annotate traps, exceptions, and stack traces with
//! source-level context instead of raw offsets and synthetic frame names.
//!
//! The debug information rides along inside the module as custom sections
//! (`.debug_info`, `.debug_line`, ...) in the DWARF format; this crate
//! decodes them itself — abbreviation tables, DIE trees, and the
//! line-number bytecode machine — with no external object-file machinery.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────────────────┐
//! │ wasm module  │───▶│ wasm: section locator         │
//! └──────────────┘    │  (.debug_* slices, code off.) │
//!                     └──────────────┬────────────────┘
//!                                    ▼
//!                     ┌───────────────────────────────┐
//!                     │ dwarf: abbrev + info + line   │
//!                     │  (units, functions, rows)     │
//!                     └──────────────┬────────────────┘
//!                                    ▼
//!                     ┌───────────────────────────────┐
//!                     │ symbolization: SourceMap      │
//!                     │  resolve(addr) → file:line:fn │
//!                     └──────────────┬────────────────┘
//!                                    ▼
//!                     ┌───────────────────────────────┐
//!                     │ export: JSON source report    │
//!                     └───────────────────────────────┘
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,no_run
//! use trapline::SourceMap;
//!
//! let module = std::fs::read("app.wasm")?;
//! let map = SourceMap::from_module_bytes(&module)?;
//!
//! // One call per stack frame, from any thread.
//! if let Some(hit) = map.resolve(0x1a3f) {
//!     if let Some(loc) = &hit.location {
//!         println!("{}:{}:{}", loc.file, loc.line, loc.column);
//!     }
//!     if let Some(function) = &hit.function {
//!         println!("  in {function}");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Degradation model
//!
//! Malformed debug info is the norm, not the exception. Corruption local to
//! one compilation unit is logged and skipped — the rest of the module still
//! resolves — and `resolve` itself is total: it answers `None` for unknown
//! addresses instead of erroring. Only a module whose section table or first
//! unit header cannot be framed at all fails the build.

pub mod cli;
pub mod domain;
pub mod dwarf;
pub mod export;
pub mod symbolization;
pub mod wasm;

pub use domain::ResolverError;
pub use export::SourceReport;
pub use symbolization::{Location, Resolution, SourceMap};

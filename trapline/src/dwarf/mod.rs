//! Hand-rolled DWARF decoding.
//!
//! The decode pipeline, leaves first:
//!
//! - [`reader`]: bounds-checked cursor; the only way bytes are read
//! - [`constants`]: the DW_* numeric vocabulary
//! - [`abbrev`]: abbreviation tables (DIE decode recipes)
//! - [`info`]: compilation units and DIEs — names, line-program offsets,
//!   function PC ranges
//! - [`line`]: the line-number program interpreter — address→line rows
//!
//! Everything here is per-section and per-unit; merging across units and
//! answering queries is `symbolization`'s job.

pub mod abbrev;
pub mod constants;
pub mod info;
pub mod line;
pub mod reader;

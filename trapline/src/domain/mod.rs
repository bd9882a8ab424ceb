//! Domain model for trapline
//!
//! Core error taxonomy shared by every parsing stage. Kept separate from the
//! parsers so the resolver facade can report causes without depending on
//! parser internals.

pub mod errors;

pub use errors::{ResolverError, Result};

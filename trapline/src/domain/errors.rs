//! Structured error types for trapline
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Corruption is reported once, at build time, and only when it is global:
//! damage local to one compilation unit downgrades that unit to "no symbols"
//! instead of failing the build. `SourceMap::resolve` itself is total and
//! never returns an error for any address.

use thiserror::Error;

/// Result alias used throughout the decoding pipeline.
pub type Result<T, E = ResolverError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// A read ran past the end of a section. Fatal to the unit being parsed.
    #[error("unexpected end of data in {section} at offset {offset:#x}")]
    UnexpectedEndOfData { section: &'static str, offset: usize },

    /// A LEB128 encoding exceeded the width of its target integer.
    #[error("malformed LEB128 varint in {section} at offset {offset:#x}")]
    MalformedVarint { section: &'static str, offset: usize },

    /// A compilation unit declared a DWARF version outside the allow-list.
    #[error("unsupported DWARF version {0}")]
    UnsupportedVersion(u16),

    /// An attribute form (or header construct, e.g. the 64-bit DWARF
    /// escape) whose byte width we cannot know. Skipping it would desync
    /// the stream, so the unit is dropped instead of guessed at.
    #[error("unsupported DWARF form {0:#x}")]
    UnsupportedForm(u64),

    /// An offset pointed outside its target section. The referencing
    /// attribute is treated as absent.
    #[error("unresolved reference into {section} at offset {offset:#x}")]
    UnresolvedReference { section: &'static str, offset: usize },

    /// A header field held a value the format forbids (e.g. a zero
    /// line_range, which would make special-opcode decoding divide by zero).
    #[error("corrupt {what} in {section}")]
    Corrupt { section: &'static str, what: &'static str },

    /// The module carries neither `.debug_info` nor `.debug_line`.
    #[error("no debug information available")]
    MissingSections,

    /// The input is not a wasm module we can scan for sections.
    #[error("not a valid WebAssembly module: {0}")]
    InvalidModule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_data_display() {
        let err = ResolverError::UnexpectedEndOfData { section: ".debug_line", offset: 0x40 };
        assert_eq!(err.to_string(), "unexpected end of data in .debug_line at offset 0x40");
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = ResolverError::UnsupportedVersion(3);
        assert_eq!(err.to_string(), "unsupported DWARF version 3");
    }

    #[test]
    fn test_invalid_module_display() {
        let err = ResolverError::InvalidModule("magic mismatch".to_string());
        assert!(err.to_string().contains("magic mismatch"));
    }
}

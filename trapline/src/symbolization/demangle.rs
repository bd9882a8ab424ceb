//! Best-effort symbol demangling.

use rustc_demangle::try_demangle;

/// Demangle `raw` if it uses a recognized scheme.
///
/// Rust's legacy and v0 manglings are decoded via `rustc-demangle` (the `#`
/// format drops the trailing disambiguator hash). Anything else — Go and C
/// symbols are plain identifiers already — comes back unchanged, so a failed
/// demangle never loses the original name.
#[must_use]
pub fn demangle(raw: &str) -> String {
    match try_demangle(raw) {
        Ok(sym) => format!("{sym:#}"),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_legacy() {
        assert_eq!(
            demangle("_ZN4core3fmt5Write10write_char17h1234567890abcdefE"),
            "core::fmt::Write::write_char"
        );
    }

    #[test]
    fn test_unrecognized_returns_input() {
        assert_eq!(demangle("not_a_known_mangling_scheme"), "not_a_known_mangling_scheme");
    }

    #[test]
    fn test_go_style_passthrough() {
        // Go symbols are not mangled; they must come through untouched.
        assert_eq!(demangle("runtime.gopanic"), "runtime.gopanic");
        assert_eq!(demangle("main.(*Server).Run"), "main.(*Server).Run");
    }

    #[test]
    fn test_empty() {
        assert_eq!(demangle(""), "");
    }
}

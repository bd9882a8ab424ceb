//! Source-path assembly.
//!
//! DWARF file tables carry (directory, file) fragments from whatever machine
//! compiled the module, so separators come in both flavors and entries may
//! be absolute, relative, or URL-like (`https://...` in some toolchains).
//! Joining follows the DWARF rule: an absolute component replaces everything
//! accumulated before it.

/// Normalize separators to forward slashes.
#[must_use]
pub fn normalize(path: &str) -> String {
    path.replace("\\\\", "/").replace('\\', "/")
}

/// Append `component` to `base`; an absolute component (or URL) wins
/// outright.
#[must_use]
pub fn join(base: &str, component: &str) -> String {
    let component = normalize(component);
    if component.starts_with('/') || component.contains("://") {
        return component;
    }
    let mut out = normalize(base);
    if !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    out.push_str(&component);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_unix() {
        assert_eq!(join("/etc", "passwd"), "/etc/passwd");
        assert_eq!(join(join("/", "etc").as_str(), "passwd"), "/etc/passwd");
    }

    #[test]
    fn test_absolute_component_replaces_base() {
        assert_eq!(join("/etc", "/etc/hosts"), "/etc/hosts");
        assert_eq!(join("/rustc/folder", "/rustc/folder/file.rs"), "/rustc/folder/file.rs");
    }

    #[test]
    fn test_join_windows_separators() {
        assert_eq!(join("C:\\", "Windows"), "C:/Windows");
        assert_eq!(join("C:/Windows", "System32\\drivers"), "C:/Windows/System32/drivers");
        assert_eq!(join("\\\\Server", "Share"), "/Server/Share");
    }

    #[test]
    fn test_join_empty_base() {
        assert_eq!(join("", "lib.rs"), "lib.rs");
    }

    #[test]
    fn test_url_component() {
        assert_eq!(join("/src", "https://example.com/x.rs"), "https://example.com/x.rs");
    }
}

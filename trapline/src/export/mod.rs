//! Source-report export.
//!
//! The whole line table of a module, grouped per compilation unit and per
//! source file, as serde-serializable JSON: the offline format consumed by
//! debugger front ends that want the full address→source mapping up front
//! instead of querying one frame at a time. A module without usable debug
//! info produces an error document rather than a serialization failure.

use serde::{Deserialize, Serialize};

use crate::domain::ResolverError;
use crate::symbolization::SourceMap;

/// Top-level report: either units or an error, never both.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<SourceUnit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub name: String,
    pub directory: String,
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    /// `[module_offset, line, column]` triples, sorted and deduplicated by
    /// offset.
    pub lines: Vec<[u64; 3]>,
}

impl SourceReport {
    /// Snapshot a built map into report form.
    #[must_use]
    pub fn from_map(map: &SourceMap) -> Self {
        if !map.has_debug_info() {
            return Self::from_error(ResolverError::MissingSections.to_string());
        }

        // Bucket the merged rows back into per-file line lists.
        let mut per_file: Vec<Vec<[u64; 3]>> = vec![Vec::new(); map.files().len()];
        for row in map.report_rows() {
            if let Some(bucket) = per_file.get_mut(row.file as usize) {
                bucket.push([row.address, u64::from(row.line), u64::from(row.column)]);
            }
        }

        let mut units = Vec::new();
        for unit in map.units() {
            let mut files = Vec::new();
            for id in unit.file_start..unit.file_end {
                let Some(lines) = per_file.get_mut(id as usize) else { continue };
                if lines.is_empty() {
                    // Declared in the file table but never referenced by a row.
                    continue;
                }
                lines.sort_by_key(|entry| entry[0]);
                lines.dedup_by_key(|entry| entry[0]);
                files.push(SourceFile {
                    path: map.files()[id as usize].clone(),
                    lines: std::mem::take(lines),
                });
            }
            if !files.is_empty() {
                units.push(SourceUnit {
                    name: unit.name.clone(),
                    directory: unit.directory.clone(),
                    files,
                });
            }
        }
        Self { units: Some(units), error: None }
    }

    /// An error document, mirroring the shape consumers already parse.
    #[must_use]
    pub fn from_error(message: String) -> Self {
        Self { units: None, error: Some(message) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_document_shape() {
        let report = SourceReport::from_error("boom".to_string());
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_units_serialization_skips_error() {
        let report = SourceReport {
            units: Some(vec![SourceUnit {
                name: "main.rs".to_string(),
                directory: "/src".to_string(),
                files: vec![SourceFile {
                    path: "/src/main.rs".to_string(),
                    lines: vec![[0x10, 5, 0]],
                }],
            }]),
            error: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("error"));
        let parsed: SourceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_empty_map_yields_error_document() {
        let map = SourceMap::from_sections(std::iter::empty()).unwrap();
        let report = SourceReport::from_map(&map);
        assert!(report.units.is_none());
        assert_eq!(report.error.as_deref(), Some("no debug information available"));
    }
}

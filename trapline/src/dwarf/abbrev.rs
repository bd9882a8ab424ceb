//! `.debug_abbrev` decoding.
//!
//! Each compilation unit references, by offset, one abbreviation table that
//! maps its DIE codes to decode recipes: a tag, a has-children flag, and an
//! ordered list of (attribute, form) pairs. Codes are only unique within one
//! table. Tags and attributes are kept as raw numbers so producer extensions
//! we do not know about pass through instead of aborting the parse.

use std::collections::HashMap;

use super::constants;
use super::reader::Reader;
use crate::domain::Result;

/// One attribute slot of an abbreviation declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub attr: u64,
    pub form: u64,
    /// Only meaningful when `form` is `DW_FORM_implicit_const`: the value
    /// lives here in the table, not in the DIE stream.
    pub implicit_const: i64,
}

/// Decode recipe for every DIE carrying this declaration's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbbrevDecl {
    pub tag: u64,
    pub has_children: bool,
    pub attrs: Vec<AttrSpec>,
}

/// The abbreviation table of one compilation unit.
#[derive(Debug, Default)]
pub struct AbbrevTable {
    decls: HashMap<u64, AbbrevDecl>,
}

impl AbbrevTable {
    /// Decode the table starting at `offset`, up to its code-0 terminator.
    pub fn parse(section: &[u8], offset: usize) -> Result<Self> {
        let mut r = Reader::new(section, ".debug_abbrev");
        r.seek(offset)?;

        let mut decls = HashMap::new();
        loop {
            let code = r.read_uleb128()?;
            if code == 0 {
                break;
            }
            let tag = r.read_uleb128()?;
            let has_children = r.read_u8()? != 0;

            let mut attrs = Vec::new();
            loop {
                let attr = r.read_uleb128()?;
                let form = r.read_uleb128()?;
                if attr == 0 && form == 0 {
                    break;
                }
                let implicit_const = if form == constants::DW_FORM_implicit_const {
                    r.read_sleb128()?
                } else {
                    0
                };
                attrs.push(AttrSpec { attr, form, implicit_const });
            }
            decls.insert(code, AbbrevDecl { tag, has_children, attrs });
        }
        Ok(Self { decls })
    }

    #[must_use]
    pub fn get(&self, code: u64) -> Option<&AbbrevDecl> {
        self.decls.get(&code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResolverError;

    // code 1: compile_unit, has children, [(name, string)]
    // code 2: subprogram, leaf, [(low_pc, addr), (high_pc, data4)]
    const TABLE: &[u8] = &[
        0x01, 0x11, 0x01, 0x03, 0x08, 0x00, 0x00, //
        0x02, 0x2e, 0x00, 0x11, 0x01, 0x12, 0x06, 0x00, 0x00, //
        0x00,
    ];

    #[test]
    fn test_parse_table() {
        let table = AbbrevTable::parse(TABLE, 0).unwrap();
        assert_eq!(table.len(), 2);

        let cu = table.get(1).unwrap();
        assert_eq!(cu.tag, constants::DW_TAG_compile_unit);
        assert!(cu.has_children);
        assert_eq!(cu.attrs.len(), 1);
        assert_eq!(cu.attrs[0].attr, constants::DW_AT_name);
        assert_eq!(cu.attrs[0].form, constants::DW_FORM_string);

        let sub = table.get(2).unwrap();
        assert_eq!(sub.tag, constants::DW_TAG_subprogram);
        assert!(!sub.has_children);
        assert_eq!(sub.attrs.len(), 2);
    }

    #[test]
    fn test_unknown_codes_are_preserved() {
        // Vendor-specific tag/attr codes must survive decoding opaquely.
        let table_bytes = [0x01, 0x89, 0x82, 0x01, 0x00, 0xd2, 0x41, 0x0b, 0x00, 0x00, 0x00];
        let table = AbbrevTable::parse(&table_bytes, 0).unwrap();
        let decl = table.get(1).unwrap();
        assert_eq!(decl.tag, 0x4109);
        assert_eq!(decl.attrs[0].attr, 0x20d2);
        assert_eq!(decl.attrs[0].form, constants::DW_FORM_data1);
    }

    #[test]
    fn test_implicit_const_lives_in_table() {
        let table_bytes = [0x01, 0x2e, 0x00, 0x3a, 0x21, 0x7f, 0x00, 0x00, 0x00];
        let table = AbbrevTable::parse(&table_bytes, 0).unwrap();
        let decl = table.get(1).unwrap();
        assert_eq!(decl.attrs[0].form, constants::DW_FORM_implicit_const);
        assert_eq!(decl.attrs[0].implicit_const, -1);
    }

    #[test]
    fn test_truncated_table_fails() {
        let result = AbbrevTable::parse(&TABLE[..5], 0);
        assert!(matches!(result, Err(ResolverError::UnexpectedEndOfData { .. })));
    }
}

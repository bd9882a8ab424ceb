//! WebAssembly module scanning.
//!
//! Producers embed DWARF as custom sections named after the classic ELF
//! section names (`.debug_info`, `.debug_line`, ...). This module walks a
//! module's section table once, slices those sections out by name, and
//! records where the code section payload starts — DWARF addresses in wasm
//! are relative to the code section, and adding that offset turns them into
//! the module-relative offsets runtimes report in traps and stack frames.

use log::debug;

use crate::domain::{ResolverError, Result};
use crate::dwarf::reader::Reader;

const WASM_MAGIC: &[u8; 4] = b"\0asm";
const WASM_VERSION: u32 = 1;

const SECTION_CUSTOM: u64 = 0;
const SECTION_CODE: u64 = 10;

/// Byte slices of the DWARF sections found in a module.
///
/// Absent sections stay empty; the parsers treat an empty auxiliary section
/// as "every reference into it is unresolved", not as an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugSections<'a> {
    pub info: &'a [u8],
    pub abbrev: &'a [u8],
    pub line: &'a [u8],
    pub line_str: &'a [u8],
    /// `.debug_str`
    pub strings: &'a [u8],
    pub str_offsets: &'a [u8],
    pub addr: &'a [u8],
    pub ranges: &'a [u8],
    pub rnglists: &'a [u8],
}

impl<'a> DebugSections<'a> {
    /// File a named section into its slot. Unrecognized names are ignored.
    pub fn insert(&mut self, name: &str, bytes: &'a [u8]) {
        match name {
            ".debug_info" => self.info = bytes,
            ".debug_abbrev" => self.abbrev = bytes,
            ".debug_line" => self.line = bytes,
            ".debug_line_str" => self.line_str = bytes,
            ".debug_str" => self.strings = bytes,
            ".debug_str_offsets" => self.str_offsets = bytes,
            ".debug_addr" => self.addr = bytes,
            ".debug_ranges" => self.ranges = bytes,
            ".debug_rnglists" => self.rnglists = bytes,
            _ => {}
        }
    }

    /// Collect from pre-extracted (name, bytes) pairs, the boundary used by
    /// hosts that run their own module parser.
    pub fn from_named<I>(sections: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut out = Self::default();
        for (name, bytes) in sections {
            out.insert(name, bytes);
        }
        out
    }

    /// True when nothing resolvable was found: without `.debug_info` and
    /// `.debug_line` there is no debug information available.
    #[must_use]
    pub fn is_unusable(&self) -> bool {
        self.info.is_empty() && self.line.is_empty()
    }
}

/// Result of scanning one module.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScannedModule<'a> {
    pub sections: DebugSections<'a>,
    /// Offset of the code section payload from the start of the module,
    /// absent when the module carries no code section.
    pub code_offset: Option<u64>,
}

/// Walk the module's section table and slice out the debug sections.
///
/// Only a module that cannot be framed at all (bad magic/version, truncated
/// section table) is an error; a module with no debug sections scans
/// successfully and resolves nothing.
pub fn scan_module(bytes: &[u8]) -> Result<ScannedModule<'_>> {
    let mut r = Reader::new(bytes, "module");

    let magic = r
        .read_bytes(4)
        .map_err(|_| ResolverError::InvalidModule("shorter than the 8-byte header".to_string()))?;
    if magic != WASM_MAGIC {
        return Err(ResolverError::InvalidModule("magic mismatch".to_string()));
    }
    let version = r
        .read_u32()
        .map_err(|_| ResolverError::InvalidModule("shorter than the 8-byte header".to_string()))?;
    if version != WASM_VERSION {
        return Err(ResolverError::InvalidModule(format!("unsupported version {version}")));
    }

    let mut scan = ScannedModule::default();
    while !r.is_empty() {
        let id = r.read_uleb128()?;
        let size = usize::try_from(r.read_uleb128()?)
            .map_err(|_| ResolverError::InvalidModule("section size overflow".to_string()))?;
        let payload_start = r.pos();
        let payload = r.read_bytes(size)?;

        match id {
            SECTION_CUSTOM => {
                let mut pr = Reader::new(payload, "custom section");
                let name_len = usize::try_from(pr.read_uleb128()?)
                    .map_err(|_| ResolverError::InvalidModule("name overflow".to_string()))?;
                let name_bytes = pr.read_bytes(name_len)?;
                let name = String::from_utf8_lossy(name_bytes);
                if name.starts_with(".debug_") {
                    let body = &payload[pr.pos()..];
                    debug!("found {name} ({} bytes)", body.len());
                    scan.sections.insert(&name, body);
                }
            }
            SECTION_CODE => {
                scan.code_offset = Some(payload_start as u64);
            }
            _ => {}
        }
    }
    Ok(scan)
}

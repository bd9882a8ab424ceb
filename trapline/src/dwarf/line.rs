//! `.debug_line` — the line-number program interpreter.
//!
//! DWARF does not store the address→line table row by row. Each compilation
//! unit carries a bytecode program that, executed against a small register
//! machine, reconstructs the rows. The header declares the decode parameters
//! (opcode base, line base/range for the packed "special" opcodes, the
//! directory and file-name tables); the program body then mixes three opcode
//! classes:
//!
//! - special opcodes (one byte ≥ opcode_base): packed (address delta,
//!   line delta), emit a row
//! - standard opcodes (1..opcode_base): register updates with declared
//!   operand encodings, `DW_LNS_copy` emits a row
//! - extended opcodes (byte 0, length-prefixed): `end_sequence`,
//!   `set_address`, `define_file`, ...
//!
//! `end_sequence` rows mark the exclusive end of a contiguous address run
//! and carry no usable location; they exist only to bound ranges.

use std::borrow::Cow;

use log::debug;

use super::constants::{
    DW_LNCT_directory_index, DW_LNCT_path, DW_LNE_define_file, DW_LNE_end_sequence,
    DW_LNE_set_address, DW_LNE_set_discriminator, DW_LNS_advance_line, DW_LNS_advance_pc,
    DW_LNS_const_add_pc, DW_LNS_copy, DW_LNS_fixed_advance_pc, DW_LNS_negate_stmt,
    DW_LNS_set_basic_block, DW_LNS_set_column, DW_LNS_set_epilogue_begin, DW_LNS_set_file,
    DW_LNS_set_isa, DW_LNS_set_prologue_end,
};
use super::constants::{
    DW_FORM_block, DW_FORM_data1, DW_FORM_data16, DW_FORM_data2, DW_FORM_data4, DW_FORM_data8,
    DW_FORM_line_strp, DW_FORM_string, DW_FORM_strp, DW_FORM_udata,
};
use super::reader::Reader;
use crate::domain::{ResolverError, Result};

/// One materialized row of a unit's line table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRow {
    pub address: u64,
    /// File value as emitted by the program; its meaning is
    /// version-dependent (see [`LineProgram::file_base`]).
    pub file: u64,
    pub line: u32,
    pub column: u32,
    pub is_stmt: bool,
    pub end_sequence: bool,
}

/// A file-name entry from the program header (or a `DW_LNE_define_file`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub dir_index: u64,
    pub path: String,
}

/// Decoded header tables plus the materialized rows of one line program.
#[derive(Debug, Clone)]
pub struct LineProgram {
    pub version: u16,
    pub include_dirs: Vec<String>,
    pub files: Vec<FileEntry>,
    /// File value of the first entry in `files`: 0 for DWARF 5 tables,
    /// 1 before that (where file 0 names the unit's primary source file,
    /// which is not part of the table).
    pub file_base: u64,
    /// Sorted by address (stable, preserving emission order for equal
    /// addresses — later rows refine earlier state).
    pub rows: Vec<LineRow>,
}

/// The sections a line program may reach into.
#[derive(Debug, Clone, Copy)]
pub struct LineSections<'a> {
    pub line: &'a [u8],
    pub line_str: &'a [u8],
    pub strings: &'a [u8],
}

struct LineHeader {
    min_inst_len: u8,
    default_is_stmt: bool,
    line_base: i8,
    line_range: u8,
    opcode_base: u8,
    std_opcode_lengths: Vec<u8>,
}

/// The interpreter's register file. Owned exclusively by one
/// [`parse_line_program`] invocation; never escapes it.
struct LineState {
    address: u64,
    file: u64,
    line: i64,
    column: u64,
    is_stmt: bool,
    end_sequence: bool,
}

impl LineState {
    fn new(header: &LineHeader) -> Self {
        Self {
            address: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: header.default_is_stmt,
            end_sequence: false,
        }
    }

    fn row(&self) -> LineRow {
        LineRow {
            address: self.address,
            file: self.file,
            line: u32::try_from(self.line.max(0)).unwrap_or(u32::MAX),
            column: u32::try_from(self.column).unwrap_or(u32::MAX),
            is_stmt: self.is_stmt,
            end_sequence: self.end_sequence,
        }
    }
}

/// Execute the line program for one compilation unit, starting at `offset`
/// into `.debug_line`.
pub fn parse_line_program(sections: &LineSections<'_>, offset: usize) -> Result<LineProgram> {
    let mut r = Reader::new(sections.line, ".debug_line");
    r.seek(offset)?;

    let unit_length = r.read_initial_length()?;
    let unit_end = r.pos().checked_add(unit_length).filter(|&end| end <= r.len()).ok_or(
        ResolverError::UnexpectedEndOfData { section: ".debug_line", offset },
    )?;

    let version = r.read_u16()?;
    if !(2..=5).contains(&version) {
        return Err(ResolverError::UnsupportedVersion(version));
    }
    if version >= 5 {
        let _address_size = r.read_u8()?;
        let _segment_selector_size = r.read_u8()?;
    }

    let header_length = r.read_u32()? as usize;
    let program_start = r.pos().checked_add(header_length).filter(|&p| p <= unit_end).ok_or(
        ResolverError::UnexpectedEndOfData { section: ".debug_line", offset },
    )?;

    let min_inst_len = r.read_u8()?;
    if version >= 4 {
        let _max_ops_per_inst = r.read_u8()?;
    }
    let default_is_stmt = r.read_u8()? != 0;
    let line_base = i8::from_le_bytes([r.read_u8()?]);
    let line_range = r.read_u8()?;
    let opcode_base = r.read_u8()?;
    if line_range == 0 {
        return Err(ResolverError::Corrupt { section: ".debug_line", what: "zero line_range" });
    }
    if opcode_base == 0 {
        return Err(ResolverError::Corrupt { section: ".debug_line", what: "zero opcode_base" });
    }

    let mut std_opcode_lengths = Vec::with_capacity(usize::from(opcode_base) - 1);
    for _ in 1..opcode_base {
        std_opcode_lengths.push(r.read_u8()?);
    }

    let header = LineHeader {
        min_inst_len,
        default_is_stmt,
        line_base,
        line_range,
        opcode_base,
        std_opcode_lengths,
    };

    let (include_dirs, mut files) = if version >= 5 {
        parse_tables_v5(&mut r, sections)?
    } else {
        parse_tables_legacy(&mut r)?
    };

    // The header_length field governs where the program begins, regardless
    // of how much table data we understood.
    r.seek(program_start)?;
    let rows = run_program(&mut r, unit_end, &header, &mut files)?;

    debug!(
        "line program at {offset:#x}: v{version}, {} dirs, {} files, {} rows",
        include_dirs.len(),
        files.len(),
        rows.len()
    );

    Ok(LineProgram {
        version,
        include_dirs,
        files,
        file_base: if version >= 5 { 0 } else { 1 },
        rows,
    })
}

/// DWARF 2–4 tables: null-terminated entries, empty string ends each list.
fn parse_tables_legacy(r: &mut Reader<'_>) -> Result<(Vec<String>, Vec<FileEntry>)> {
    let mut dirs = Vec::new();
    loop {
        if r.peek_u8()? == 0 {
            r.skip(1)?;
            break;
        }
        dirs.push(r.read_cstr()?.into_owned());
    }

    let mut files = Vec::new();
    loop {
        if r.peek_u8()? == 0 {
            r.skip(1)?;
            break;
        }
        let path = r.read_cstr()?.into_owned();
        let dir_index = r.read_uleb128()?;
        let _mtime = r.read_uleb128()?;
        let _size = r.read_uleb128()?;
        files.push(FileEntry { dir_index, path });
    }
    Ok((dirs, files))
}

/// DWARF 5 tables: each list is prefixed with an entry format (pairs of
/// content-type and form codes) that every entry then follows.
fn parse_tables_v5<'a>(
    r: &mut Reader<'a>,
    sections: &LineSections<'a>,
) -> Result<(Vec<String>, Vec<FileEntry>)> {
    let dirs = parse_entries_v5(r, sections)?.into_iter().map(|entry| entry.path).collect();
    let files = parse_entries_v5(r, sections)?;
    Ok((dirs, files))
}

fn parse_entries_v5<'a>(r: &mut Reader<'a>, sections: &LineSections<'a>) -> Result<Vec<FileEntry>> {
    let format_count = r.read_u8()?;
    let mut formats = Vec::with_capacity(usize::from(format_count));
    for _ in 0..format_count {
        let content = r.read_uleb128()?;
        let form = r.read_uleb128()?;
        formats.push((content, form));
    }

    let count = r.read_uleb128()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let mut entry = FileEntry { dir_index: 0, path: String::new() };
        for &(content, form) in &formats {
            match content {
                DW_LNCT_path => {
                    if let Some(path) = read_entry_string(r, form, sections)? {
                        entry.path = path.into_owned();
                    }
                }
                DW_LNCT_directory_index => {
                    entry.dir_index = read_entry_unsigned(r, form)?;
                }
                // Timestamp, size, md5 and vendor content: consume, ignore.
                _ => skip_entry_form(r, form)?,
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn read_entry_string<'a>(
    r: &mut Reader<'a>,
    form: u64,
    sections: &LineSections<'a>,
) -> Result<Option<Cow<'a, str>>> {
    match form {
        DW_FORM_string => Ok(Some(r.read_cstr()?)),
        DW_FORM_line_strp => {
            let offset = r.read_u32()? as usize;
            Ok(str_at(sections.line_str, ".debug_line_str", offset))
        }
        DW_FORM_strp => {
            let offset = r.read_u32()? as usize;
            Ok(str_at(sections.strings, ".debug_str", offset))
        }
        other => Err(ResolverError::UnsupportedForm(other)),
    }
}

fn read_entry_unsigned(r: &mut Reader<'_>, form: u64) -> Result<u64> {
    match form {
        DW_FORM_udata => r.read_uleb128(),
        DW_FORM_data1 => Ok(u64::from(r.read_u8()?)),
        DW_FORM_data2 => Ok(u64::from(r.read_u16()?)),
        DW_FORM_data4 => Ok(u64::from(r.read_u32()?)),
        DW_FORM_data8 => r.read_u64(),
        other => Err(ResolverError::UnsupportedForm(other)),
    }
}

fn skip_entry_form(r: &mut Reader<'_>, form: u64) -> Result<()> {
    match form {
        DW_FORM_string => {
            let _ = r.read_cstr()?;
        }
        DW_FORM_data1 => r.skip(1)?,
        DW_FORM_data2 => r.skip(2)?,
        DW_FORM_data4 | DW_FORM_strp | DW_FORM_line_strp => r.skip(4)?,
        DW_FORM_data8 => r.skip(8)?,
        DW_FORM_data16 => r.skip(16)?,
        DW_FORM_udata => {
            let _ = r.read_uleb128()?;
        }
        DW_FORM_block => {
            let len = usize::try_from(r.read_uleb128()?)
                .map_err(|_| ResolverError::Corrupt { section: ".debug_line", what: "block length" })?;
            r.skip(len)?;
        }
        other => return Err(ResolverError::UnsupportedForm(other)),
    }
    Ok(())
}

/// Look up a null-terminated string at an offset into an auxiliary section.
/// A dangling offset yields `None` (the entry is left unnamed, not fatal).
fn str_at<'a>(data: &'a [u8], section: &'static str, offset: usize) -> Option<Cow<'a, str>> {
    let mut r = Reader::new(data, section);
    r.seek(offset).ok()?;
    r.read_cstr().ok()
}

/// Run the register machine over the program body, materializing rows.
fn run_program(
    r: &mut Reader<'_>,
    unit_end: usize,
    header: &LineHeader,
    files: &mut Vec<FileEntry>,
) -> Result<Vec<LineRow>> {
    let mut rows = Vec::new();
    let mut state = LineState::new(header);

    while r.pos() < unit_end {
        let opcode = r.read_u8()?;
        if opcode >= header.opcode_base {
            // Special opcode: packed address and line advance, emits a row.
            let adjusted = opcode - header.opcode_base;
            let addr_adv =
                u64::from(adjusted / header.line_range) * u64::from(header.min_inst_len);
            let line_adv =
                i64::from(header.line_base) + i64::from(adjusted % header.line_range);
            state.address = state.address.wrapping_add(addr_adv);
            state.line += line_adv;
            rows.push(state.row());
        } else if opcode == 0 {
            execute_extended(r, header, &mut state, &mut rows, files)?;
        } else {
            execute_standard(r, opcode, header, &mut state, &mut rows)?;
        }
    }

    // The program may emit non-monotonic addresses; the materialized table
    // must be sorted for binary search. Stable, so same-address refinements
    // keep their emission order.
    rows.sort_by_key(|row| row.address);
    Ok(rows)
}

fn execute_standard(
    r: &mut Reader<'_>,
    opcode: u8,
    header: &LineHeader,
    state: &mut LineState,
    rows: &mut Vec<LineRow>,
) -> Result<()> {
    match opcode {
        DW_LNS_copy => rows.push(state.row()),
        DW_LNS_advance_pc => {
            let adv = r.read_uleb128()?;
            state.address = state.address.wrapping_add(adv * u64::from(header.min_inst_len));
        }
        DW_LNS_advance_line => state.line += r.read_sleb128()?,
        DW_LNS_set_file => state.file = r.read_uleb128()?,
        DW_LNS_set_column => state.column = r.read_uleb128()?,
        DW_LNS_negate_stmt => state.is_stmt = !state.is_stmt,
        DW_LNS_set_basic_block | DW_LNS_set_prologue_end | DW_LNS_set_epilogue_begin => {
            // Flags we do not materialize.
        }
        DW_LNS_const_add_pc => {
            // Advances like special opcode 255 without emitting a row.
            let adjusted = 255 - header.opcode_base;
            state.address = state.address.wrapping_add(
                u64::from(adjusted / header.line_range) * u64::from(header.min_inst_len),
            );
        }
        DW_LNS_fixed_advance_pc => {
            // The one standard opcode whose operand is not scaled.
            state.address = state.address.wrapping_add(u64::from(r.read_u16()?));
        }
        DW_LNS_set_isa => {
            let _ = r.read_uleb128()?;
        }
        _ => {
            // Producer-specific standard opcode: the header tells us how
            // many uleb operands to discard.
            let operands = header
                .std_opcode_lengths
                .get(usize::from(opcode) - 1)
                .copied()
                .unwrap_or(0);
            for _ in 0..operands {
                let _ = r.read_uleb128()?;
            }
        }
    }
    Ok(())
}

fn execute_extended(
    r: &mut Reader<'_>,
    header: &LineHeader,
    state: &mut LineState,
    rows: &mut Vec<LineRow>,
    files: &mut Vec<FileEntry>,
) -> Result<()> {
    let len = usize::try_from(r.read_uleb128()?)
        .map_err(|_| ResolverError::Corrupt { section: ".debug_line", what: "extended opcode length" })?;
    if len == 0 {
        return Ok(());
    }
    let body = r.read_bytes(len)?;
    let mut er = Reader::new(body, ".debug_line");

    match er.read_u8()? {
        DW_LNE_end_sequence => {
            state.end_sequence = true;
            rows.push(state.row());
            *state = LineState::new(header);
        }
        DW_LNE_set_address => {
            state.address = match er.remaining() {
                4 => u64::from(er.read_u32()?),
                8 => er.read_u64()?,
                other => return Err(ResolverError::UnsupportedForm(other as u64)),
            };
        }
        DW_LNE_define_file => {
            // Pre-v5 inline extension of the file table.
            let path = er.read_cstr()?.into_owned();
            let dir_index = er.read_uleb128()?;
            let _mtime = er.read_uleb128()?;
            let _size = er.read_uleb128()?;
            files.push(FileEntry { dir_index, path });
        }
        DW_LNE_set_discriminator => {
            let _ = er.read_uleb128()?;
        }
        other => {
            // Unknown extended opcode: its length prefix already told us
            // how much to skip.
            debug!("skipping unknown extended line opcode {other:#x} ({len} bytes)");
        }
    }
    Ok(())
}

//! `.debug_info` — compilation-unit and DIE decoding.
//!
//! A unit's DIEs form a tree, but the tree is implicit: entries are stored
//! flat, each one prefixed with an abbreviation code; a `has_children` flag
//! starts a nested sibling list and a code of 0 ends one. Nothing here needs
//! the tree shape, so the decoder makes a single linear pass, consuming the
//! terminators in place, and extracts just what the resolver wants from each
//! entry: the unit's name/comp_dir/line-program offset from the root, and a
//! name plus PC range from every subprogram and inlined subroutine.
//!
//! Cross-references (`DW_AT_abstract_origin`, `DW_AT_specification`) are
//! recorded by section offset during the pass and chased afterwards against
//! an offset→name side map, so no DIE objects are retained.

use std::borrow::Cow;
use std::collections::HashMap;

use log::{debug, warn};

use super::abbrev::{AbbrevTable, AttrSpec};
use super::constants::*;
use super::reader::Reader;
use crate::domain::{ResolverError, Result};
use crate::wasm::DebugSections;

/// A decoded attribute value: a tagged variant over the primitive DWARF
/// value classes. Unknown forms are rejected before ever producing one.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue<'a> {
    Unsigned(u64),
    Signed(i64),
    /// An offset into some other debug section (`DW_FORM_sec_offset`).
    Offset(usize),
    Address(u64),
    Flag(bool),
    String(Cow<'a, str>),
    Block(&'a [u8]),
    /// Section-absolute offset of another DIE in `.debug_info`.
    Reference(usize),
}

/// Function (or inlined-call) address range extracted from one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncRange {
    /// Raw name, possibly mangled. Absent when neither the DIE nor its
    /// origin chain carries one.
    pub name: Option<String>,
    pub low_pc: u64,
    /// Exclusive.
    pub high_pc: u64,
}

/// Everything the resolver keeps from one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct UnitData {
    /// Offset of the unit header in `.debug_info`; stable identity.
    pub offset: usize,
    pub version: u16,
    pub name: Option<String>,
    pub comp_dir: Option<String>,
    /// Offset of this unit's line program in `.debug_line`.
    pub stmt_list: Option<usize>,
    pub low_pc: Option<u64>,
    pub functions: Vec<FuncRange>,
}

/// Base offsets into the v5 indirection sections. Until the root DIE
/// supplies explicit bases, these default to the post-header positions —
/// the single-contribution layout wasm producers emit.
struct Bases {
    str_offsets: usize,
    addr: usize,
    rnglists: usize,
}

impl Default for Bases {
    fn default() -> Self {
        Self { str_offsets: 8, addr: 8, rnglists: 12 }
    }
}

/// Walk every compilation unit in `.debug_info`.
///
/// Corruption inside one unit skips that unit (logged, no symbols for its
/// addresses) and parsing continues with the next; only a section whose very
/// first unit header cannot be framed is a hard error.
pub fn parse_units(sections: &DebugSections<'_>) -> Result<Vec<UnitData>> {
    let mut units = Vec::new();
    let mut r = Reader::new(sections.info, ".debug_info");

    while !r.is_empty() {
        let unit_offset = r.pos();
        let unit_length = match r.read_initial_length() {
            Ok(len) => len,
            Err(err) if unit_offset == 0 => return Err(err),
            Err(err) => {
                warn!(".debug_info: truncated unit header at {unit_offset:#x}: {err}");
                break;
            }
        };
        let Some(unit_end) = r.pos().checked_add(unit_length).filter(|&end| end <= r.len())
        else {
            let err = ResolverError::UnexpectedEndOfData {
                section: ".debug_info",
                offset: unit_offset,
            };
            if unit_offset == 0 {
                return Err(err);
            }
            warn!(".debug_info: unit at {unit_offset:#x} overruns the section: {err}");
            break;
        };

        match parse_unit(sections, r.clone(), unit_offset, unit_end) {
            Ok(unit) => {
                debug!(
                    "unit at {unit_offset:#x}: v{}, {} functions, name {:?}",
                    unit.version,
                    unit.functions.len(),
                    unit.name
                );
                units.push(unit);
            }
            Err(err) => {
                warn!(".debug_info: skipping compilation unit at {unit_offset:#x}: {err}");
            }
        }
        r.seek(unit_end)?;
    }
    Ok(units)
}

fn parse_unit<'a>(
    sections: &DebugSections<'a>,
    mut r: Reader<'a>,
    unit_offset: usize,
    unit_end: usize,
) -> Result<UnitData> {
    let version = r.read_u16()?;
    let (abbrev_offset, address_size) = match version {
        4 => {
            let abbrev_offset = r.read_u32()? as usize;
            let address_size = r.read_u8()?;
            (abbrev_offset, address_size)
        }
        5 => {
            let unit_type = r.read_u8()?;
            let address_size = r.read_u8()?;
            let abbrev_offset = r.read_u32()? as usize;
            if unit_type != DW_UT_compile && unit_type != DW_UT_partial {
                // Skeleton/split units carry their DIEs elsewhere.
                return Err(ResolverError::UnsupportedForm(u64::from(unit_type)));
            }
            (abbrev_offset, address_size)
        }
        other => return Err(ResolverError::UnsupportedVersion(other)),
    };

    let abbrevs = AbbrevTable::parse(sections.abbrev, abbrev_offset)?;

    let mut unit = UnitData { offset: unit_offset, version, ..UnitData::default() };
    let mut bases = Bases::default();
    let mut root_seen = false;

    // Offset→name for every named DIE, and offset→origin link, so
    // abstract_origin/specification chains resolve after the pass.
    let mut names: HashMap<usize, String> = HashMap::new();
    let mut links: HashMap<usize, usize> = HashMap::new();
    let mut pending: Vec<(usize, usize)> = Vec::new(); // (function idx, target offset)

    while r.pos() < unit_end {
        let die_offset = r.pos();
        let code = r.read_uleb128()?;
        if code == 0 {
            // End-of-children marker; nothing to pop in a flat pass.
            continue;
        }
        let decl = abbrevs.get(code).ok_or(ResolverError::UnresolvedReference {
            section: ".debug_abbrev",
            offset: die_offset,
        })?;

        let mut name: Option<String> = None;
        let mut linkage_name: Option<String> = None;
        let mut comp_dir: Option<String> = None;
        let mut stmt_list: Option<usize> = None;
        let mut low_pc: Option<u64> = None;
        let mut high_pc: Option<(u64, bool)> = None; // (value, is_offset_from_low)
        let mut ranges_ref: Option<RangesRef> = None;
        let mut origin: Option<usize> = None;

        for spec in &decl.attrs {
            let value = read_attr(&mut r, spec, sections, address_size, unit_offset, &bases)?;
            let Some(value) = value else { continue };
            match spec.attr {
                DW_AT_name => {
                    if let AttrValue::String(s) = value {
                        name = Some(s.into_owned());
                    }
                }
                DW_AT_linkage_name | DW_AT_MIPS_linkage_name => {
                    if let AttrValue::String(s) = value {
                        linkage_name = Some(s.into_owned());
                    }
                }
                DW_AT_comp_dir => {
                    if let AttrValue::String(s) = value {
                        comp_dir = Some(s.into_owned());
                    }
                }
                DW_AT_stmt_list => match value {
                    AttrValue::Offset(o) => stmt_list = Some(o),
                    AttrValue::Unsigned(v) => stmt_list = usize::try_from(v).ok(),
                    _ => {}
                },
                DW_AT_low_pc => {
                    if let AttrValue::Address(a) = value {
                        low_pc = Some(a);
                    }
                }
                DW_AT_high_pc => match value {
                    AttrValue::Address(a) => high_pc = Some((a, false)),
                    AttrValue::Unsigned(v) => high_pc = Some((v, true)),
                    _ => {}
                },
                DW_AT_ranges => match value {
                    AttrValue::Offset(o) => ranges_ref = Some(RangesRef::Direct(o)),
                    AttrValue::Unsigned(v) => {
                        ranges_ref = Some(if spec.form == DW_FORM_rnglistx {
                            RangesRef::Index(v)
                        } else {
                            RangesRef::Direct(usize::try_from(v).unwrap_or(usize::MAX))
                        });
                    }
                    _ => {}
                },
                DW_AT_abstract_origin | DW_AT_specification => {
                    if let AttrValue::Reference(target) = value {
                        origin = Some(target);
                    }
                }
                DW_AT_str_offsets_base => {
                    if let AttrValue::Offset(o) = value {
                        bases.str_offsets = o;
                    }
                }
                DW_AT_addr_base => {
                    if let AttrValue::Offset(o) = value {
                        bases.addr = o;
                    }
                }
                DW_AT_rnglists_base => {
                    if let AttrValue::Offset(o) = value {
                        bases.rnglists = o;
                    }
                }
                _ => {}
            }
        }

        let raw_name = name.or(linkage_name);
        if let Some(n) = &raw_name {
            names.insert(die_offset, n.clone());
        }
        if let Some(target) = origin {
            links.insert(die_offset, target);
        }

        match decl.tag {
            DW_TAG_compile_unit if !root_seen => {
                root_seen = true;
                unit.name = raw_name;
                unit.comp_dir = comp_dir;
                unit.stmt_list = stmt_list;
                unit.low_pc = low_pc;
            }
            DW_TAG_subprogram | DW_TAG_inlined_subroutine => {
                let mut die_ranges: Vec<(u64, u64)> = Vec::new();
                if let (Some(lo), Some((hi, is_offset))) = (low_pc, high_pc) {
                    let hi = if is_offset { lo.wrapping_add(hi) } else { hi };
                    die_ranges.push((lo, hi));
                } else if let Some(rref) = ranges_ref {
                    let base = unit.low_pc.or(low_pc).unwrap_or(0);
                    match read_ranges(sections, version, address_size, &bases, rref, base) {
                        Ok(ranges) => die_ranges = ranges,
                        Err(err) => {
                            debug!("ignoring range list of DIE at {die_offset:#x}: {err}");
                        }
                    }
                }
                for (lo, hi) in die_ranges {
                    if hi <= lo {
                        continue;
                    }
                    let idx = unit.functions.len();
                    unit.functions.push(FuncRange { name: raw_name.clone(), low_pc: lo, high_pc: hi });
                    if raw_name.is_none() {
                        if let Some(target) = origin {
                            pending.push((idx, target));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    // Chase origin/specification chains now that every named DIE in the
    // unit has been indexed. Chains are short in practice; the hop limit
    // guards against reference cycles in corrupt input.
    for (idx, mut target) in pending {
        let mut hops = 0;
        let resolved = loop {
            if let Some(n) = names.get(&target) {
                break Some(n.clone());
            }
            match links.get(&target) {
                Some(&next) if hops < 4 => {
                    target = next;
                    hops += 1;
                }
                _ => break None,
            }
        };
        unit.functions[idx].name = resolved;
    }

    Ok(unit)
}

enum RangesRef {
    /// Direct offset into `.debug_ranges` (v4) or `.debug_rnglists` (v5).
    Direct(usize),
    /// `DW_FORM_rnglistx` index through the offset array at rnglists_base.
    Index(u64),
}

/// Decode one attribute value, consuming exactly the bytes its form
/// prescribes. Returns `Ok(None)` when the operand was consumed but its
/// indirection target does not resolve (the attribute is treated as absent).
fn read_attr<'a>(
    r: &mut Reader<'a>,
    spec: &AttrSpec,
    sections: &DebugSections<'a>,
    address_size: u8,
    unit_offset: usize,
    bases: &Bases,
) -> Result<Option<AttrValue<'a>>> {
    read_form(r, spec.form, spec.implicit_const, sections, address_size, unit_offset, bases)
}

#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
fn read_form<'a>(
    r: &mut Reader<'a>,
    form: u64,
    implicit_const: i64,
    sections: &DebugSections<'a>,
    address_size: u8,
    unit_offset: usize,
    bases: &Bases,
) -> Result<Option<AttrValue<'a>>> {
    let value = match form {
        DW_FORM_addr => Some(AttrValue::Address(r.read_address(address_size)?)),
        DW_FORM_data1 => Some(AttrValue::Unsigned(u64::from(r.read_u8()?))),
        DW_FORM_data2 => Some(AttrValue::Unsigned(u64::from(r.read_u16()?))),
        DW_FORM_data4 => Some(AttrValue::Unsigned(u64::from(r.read_u32()?))),
        DW_FORM_data8 => Some(AttrValue::Unsigned(r.read_u64()?)),
        DW_FORM_data16 => Some(AttrValue::Block(r.read_bytes(16)?)),
        DW_FORM_sdata => Some(AttrValue::Signed(r.read_sleb128()?)),
        DW_FORM_udata => Some(AttrValue::Unsigned(r.read_uleb128()?)),
        DW_FORM_string => Some(AttrValue::String(r.read_cstr()?)),
        DW_FORM_strp => {
            let offset = r.read_u32()? as usize;
            str_at(sections.strings, ".debug_str", offset).map(AttrValue::String)
        }
        DW_FORM_line_strp => {
            let offset = r.read_u32()? as usize;
            str_at(sections.line_str, ".debug_line_str", offset).map(AttrValue::String)
        }
        DW_FORM_strx => {
            let index = r.read_uleb128()?;
            str_indexed(sections, bases, index).map(AttrValue::String)
        }
        DW_FORM_strx1 => {
            let index = u64::from(r.read_u8()?);
            str_indexed(sections, bases, index).map(AttrValue::String)
        }
        DW_FORM_strx2 => {
            let index = u64::from(r.read_u16()?);
            str_indexed(sections, bases, index).map(AttrValue::String)
        }
        DW_FORM_strx3 => {
            let b = r.read_bytes(3)?;
            let index = u64::from(u32::from_le_bytes([b[0], b[1], b[2], 0]));
            str_indexed(sections, bases, index).map(AttrValue::String)
        }
        DW_FORM_strx4 => {
            let index = u64::from(r.read_u32()?);
            str_indexed(sections, bases, index).map(AttrValue::String)
        }
        DW_FORM_addrx => {
            let index = r.read_uleb128()?;
            addr_indexed(sections, bases, address_size, index).map(AttrValue::Address)
        }
        DW_FORM_addrx1 => {
            let index = u64::from(r.read_u8()?);
            addr_indexed(sections, bases, address_size, index).map(AttrValue::Address)
        }
        DW_FORM_addrx2 => {
            let index = u64::from(r.read_u16()?);
            addr_indexed(sections, bases, address_size, index).map(AttrValue::Address)
        }
        DW_FORM_addrx3 => {
            let b = r.read_bytes(3)?;
            let index = u64::from(u32::from_le_bytes([b[0], b[1], b[2], 0]));
            addr_indexed(sections, bases, address_size, index).map(AttrValue::Address)
        }
        DW_FORM_addrx4 => {
            let index = u64::from(r.read_u32()?);
            addr_indexed(sections, bases, address_size, index).map(AttrValue::Address)
        }
        DW_FORM_ref1 => {
            let v = usize::from(r.read_u8()?);
            Some(AttrValue::Reference(unit_offset + v))
        }
        DW_FORM_ref2 => {
            let v = usize::from(r.read_u16()?);
            Some(AttrValue::Reference(unit_offset + v))
        }
        DW_FORM_ref4 => {
            let v = r.read_u32()? as usize;
            Some(AttrValue::Reference(unit_offset + v))
        }
        DW_FORM_ref8 => {
            let v = usize::try_from(r.read_u64()?).unwrap_or(usize::MAX);
            Some(AttrValue::Reference(unit_offset.saturating_add(v)))
        }
        DW_FORM_ref_udata => {
            let v = usize::try_from(r.read_uleb128()?).unwrap_or(usize::MAX);
            Some(AttrValue::Reference(unit_offset.saturating_add(v)))
        }
        DW_FORM_ref_addr => Some(AttrValue::Reference(r.read_u32()? as usize)),
        DW_FORM_ref_sig8 => {
            // Type-unit signature; type units are out of scope.
            let _ = r.read_u64()?;
            None
        }
        DW_FORM_sec_offset => Some(AttrValue::Offset(r.read_u32()? as usize)),
        DW_FORM_exprloc | DW_FORM_block => {
            let len = usize::try_from(r.read_uleb128()?).map_err(|_| ResolverError::Corrupt {
                section: ".debug_info",
                what: "block length",
            })?;
            Some(AttrValue::Block(r.read_bytes(len)?))
        }
        DW_FORM_block1 => {
            let len = usize::from(r.read_u8()?);
            Some(AttrValue::Block(r.read_bytes(len)?))
        }
        DW_FORM_block2 => {
            let len = usize::from(r.read_u16()?);
            Some(AttrValue::Block(r.read_bytes(len)?))
        }
        DW_FORM_block4 => {
            let len = r.read_u32()? as usize;
            Some(AttrValue::Block(r.read_bytes(len)?))
        }
        DW_FORM_flag => Some(AttrValue::Flag(r.read_u8()? != 0)),
        DW_FORM_flag_present => Some(AttrValue::Flag(true)),
        DW_FORM_implicit_const => Some(AttrValue::Signed(implicit_const)),
        DW_FORM_loclistx | DW_FORM_rnglistx => Some(AttrValue::Unsigned(r.read_uleb128()?)),
        DW_FORM_strp_sup | DW_FORM_ref_sup4 => {
            // Supplementary files are out of scope; consume the offset.
            let _ = r.read_u32()?;
            None
        }
        DW_FORM_ref_sup8 => {
            let _ = r.read_u64()?;
            None
        }
        DW_FORM_indirect => {
            let actual = r.read_uleb128()?;
            if actual == DW_FORM_indirect {
                return Err(ResolverError::UnsupportedForm(actual));
            }
            return read_form(r, actual, 0, sections, address_size, unit_offset, bases);
        }
        // Unknown form: its width is unknowable, so decoding cannot
        // continue in this unit without desyncing.
        other => return Err(ResolverError::UnsupportedForm(other)),
    };
    Ok(value)
}

fn str_at<'a>(data: &'a [u8], section: &'static str, offset: usize) -> Option<Cow<'a, str>> {
    let mut r = Reader::new(data, section);
    r.seek(offset).ok()?;
    r.read_cstr().ok()
}

/// `strx*`: index into the `.debug_str_offsets` array, then into `.debug_str`.
fn str_indexed<'a>(
    sections: &DebugSections<'a>,
    bases: &Bases,
    index: u64,
) -> Option<Cow<'a, str>> {
    let slot = bases.str_offsets.checked_add(usize::try_from(index).ok()?.checked_mul(4)?)?;
    let mut r = Reader::new(sections.str_offsets, ".debug_str_offsets");
    r.seek(slot).ok()?;
    let offset = r.read_u32().ok()? as usize;
    str_at(sections.strings, ".debug_str", offset)
}

/// `addrx*`: index into the `.debug_addr` pool.
fn addr_indexed(
    sections: &DebugSections<'_>,
    bases: &Bases,
    address_size: u8,
    index: u64,
) -> Option<u64> {
    let stride = usize::from(address_size);
    let slot = bases.addr.checked_add(usize::try_from(index).ok()?.checked_mul(stride)?)?;
    let mut r = Reader::new(sections.addr, ".debug_addr");
    r.seek(slot).ok()?;
    r.read_address(address_size).ok()
}

/// Read a DIE's address ranges out of `.debug_ranges` (v4) or
/// `.debug_rnglists` (v5).
fn read_ranges(
    sections: &DebugSections<'_>,
    version: u16,
    address_size: u8,
    bases: &Bases,
    rref: RangesRef,
    mut base: u64,
) -> Result<Vec<(u64, u64)>> {
    if version >= 5 {
        let offset = match rref {
            RangesRef::Direct(o) => o,
            RangesRef::Index(index) => {
                let slot = bases
                    .rnglists
                    .checked_add(
                        usize::try_from(index)
                            .ok()
                            .and_then(|i| i.checked_mul(4))
                            .ok_or(ResolverError::Corrupt {
                                section: ".debug_rnglists",
                                what: "range list index",
                            })?,
                    )
                    .ok_or(ResolverError::Corrupt {
                        section: ".debug_rnglists",
                        what: "range list index",
                    })?;
                let mut r = Reader::new(sections.rnglists, ".debug_rnglists");
                r.seek(slot)?;
                bases.rnglists + r.read_u32()? as usize
            }
        };
        read_rnglists(sections, address_size, bases, offset, base)
    } else {
        let RangesRef::Direct(offset) = rref else {
            return Err(ResolverError::UnsupportedForm(DW_FORM_rnglistx));
        };
        let mut r = Reader::new(sections.ranges, ".debug_ranges");
        r.seek(offset)?;
        let max = if address_size == 4 { u64::from(u32::MAX) } else { u64::MAX };
        let mut out = Vec::new();
        loop {
            let begin = r.read_address(address_size)?;
            let end = r.read_address(address_size)?;
            if begin == 0 && end == 0 {
                break;
            }
            if begin == max {
                base = end;
                continue;
            }
            out.push((base.wrapping_add(begin), base.wrapping_add(end)));
        }
        Ok(out)
    }
}

fn read_rnglists(
    sections: &DebugSections<'_>,
    address_size: u8,
    bases: &Bases,
    offset: usize,
    mut base: u64,
) -> Result<Vec<(u64, u64)>> {
    let mut r = Reader::new(sections.rnglists, ".debug_rnglists");
    r.seek(offset)?;
    let mut out = Vec::new();
    loop {
        match r.read_u8()? {
            DW_RLE_end_of_list => break,
            DW_RLE_base_addressx => {
                let index = r.read_uleb128()?;
                base = addr_indexed(sections, bases, address_size, index).unwrap_or(0);
            }
            DW_RLE_startx_endx => {
                let s = r.read_uleb128()?;
                let e = r.read_uleb128()?;
                if let (Some(s), Some(e)) = (
                    addr_indexed(sections, bases, address_size, s),
                    addr_indexed(sections, bases, address_size, e),
                ) {
                    out.push((s, e));
                }
            }
            DW_RLE_startx_length => {
                let s = r.read_uleb128()?;
                let len = r.read_uleb128()?;
                if let Some(s) = addr_indexed(sections, bases, address_size, s) {
                    out.push((s, s.wrapping_add(len)));
                }
            }
            DW_RLE_offset_pair => {
                let s = r.read_uleb128()?;
                let e = r.read_uleb128()?;
                out.push((base.wrapping_add(s), base.wrapping_add(e)));
            }
            DW_RLE_base_address => base = r.read_address(address_size)?,
            DW_RLE_start_end => {
                let s = r.read_address(address_size)?;
                let e = r.read_address(address_size)?;
                out.push((s, e));
            }
            DW_RLE_start_length => {
                let s = r.read_address(address_size)?;
                let len = r.read_uleb128()?;
                out.push((s, s.wrapping_add(len)));
            }
            other => return Err(ResolverError::UnsupportedForm(u64::from(other))),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uleb(out: &mut Vec<u8>, mut v: u64) {
        loop {
            let mut b = u8::try_from(v & 0x7f).unwrap();
            v >>= 7;
            if v != 0 {
                b |= 0x80;
            }
            out.push(b);
            if v == 0 {
                break;
            }
        }
    }

    /// Abbrev: 1 = compile_unit (children) [name:string, comp_dir:string,
    /// stmt_list:sec_offset, low_pc:addr]; 2 = subprogram (leaf)
    /// [name:string, low_pc:addr, high_pc:data4].
    fn test_abbrev() -> Vec<u8> {
        vec![
            0x01, 0x11, 0x01, // code 1, compile_unit, has children
            0x03, 0x08, 0x1b, 0x08, 0x10, 0x17, 0x11, 0x01, 0x00, 0x00, //
            0x02, 0x2e, 0x00, // code 2, subprogram, leaf
            0x03, 0x08, 0x11, 0x01, 0x12, 0x06, 0x00, 0x00, //
            0x00,
        ]
    }

    fn test_info() -> Vec<u8> {
        let mut dies = Vec::new();
        // Root DIE (code 1)
        uleb(&mut dies, 1);
        dies.extend_from_slice(b"main.rs\0");
        dies.extend_from_slice(b"/src\0");
        dies.extend_from_slice(&0u32.to_le_bytes()); // stmt_list
        dies.extend_from_slice(&0u32.to_le_bytes()); // low_pc
        // Subprogram (code 2)
        uleb(&mut dies, 2);
        dies.extend_from_slice(b"foo\0");
        dies.extend_from_slice(&0x10u32.to_le_bytes()); // low_pc
        dies.extend_from_slice(&0x20u32.to_le_bytes()); // high_pc (offset form)
        // End of root's children
        uleb(&mut dies, 0);

        let mut body = Vec::new();
        body.extend_from_slice(&4u16.to_le_bytes()); // version
        body.extend_from_slice(&0u32.to_le_bytes()); // abbrev offset
        body.push(4); // address size
        body.extend_from_slice(&dies);

        let mut section = u32::try_from(body.len()).unwrap().to_le_bytes().to_vec();
        section.extend_from_slice(&body);
        section
    }

    fn sections<'a>(info: &'a [u8], abbrev: &'a [u8]) -> DebugSections<'a> {
        DebugSections { info, abbrev, ..DebugSections::default() }
    }

    #[test]
    fn test_parse_minimal_unit() {
        let info = test_info();
        let abbrev = test_abbrev();
        let units = parse_units(&sections(&info, &abbrev)).unwrap();
        assert_eq!(units.len(), 1);

        let unit = &units[0];
        assert_eq!(unit.version, 4);
        assert_eq!(unit.name.as_deref(), Some("main.rs"));
        assert_eq!(unit.comp_dir.as_deref(), Some("/src"));
        assert_eq!(unit.stmt_list, Some(0));
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].name.as_deref(), Some("foo"));
        assert_eq!(unit.functions[0].low_pc, 0x10);
        // high_pc was the constant class: low_pc + 0x20.
        assert_eq!(unit.functions[0].high_pc, 0x30);
    }

    #[test]
    fn test_unknown_version_skips_unit() {
        let mut info = test_info();
        // Patch the version to 3.
        info[4] = 3;
        let abbrev = test_abbrev();
        let units = parse_units(&sections(&info, &abbrev)).unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn test_corrupt_second_unit_keeps_first() {
        let mut info = test_info();
        let good_len = info.len();
        info.extend_from_slice(&info.clone());
        // Wreck the second unit's abbrev offset so its table is garbage.
        info[good_len + 6] = 0xff;
        let abbrev = test_abbrev();
        let units = parse_units(&sections(&info, &abbrev)).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].offset, 0);
    }

    #[test]
    fn test_first_unit_unreadable_is_fatal() {
        let info = [0x20, 0x00, 0x00]; // three bytes, not even a length
        let abbrev = test_abbrev();
        assert!(parse_units(&sections(&info, &abbrev)).is_err());
    }

    #[test]
    fn test_abstract_origin_name_chase() {
        // Abbrev: 1 = compile_unit (children, no attrs);
        // 2 = subprogram leaf [name:string] (abstract instance);
        // 3 = inlined_subroutine leaf [abstract_origin:ref4, low_pc:addr,
        //     high_pc:data4].
        let abbrev = vec![
            0x01, 0x11, 0x01, 0x00, 0x00, //
            0x02, 0x2e, 0x00, 0x03, 0x08, 0x00, 0x00, //
            0x03, 0x1d, 0x00, 0x31, 0x13, 0x11, 0x01, 0x12, 0x06, 0x00, 0x00, //
            0x00,
        ];

        let mut dies = Vec::new();
        uleb(&mut dies, 1); // root, no attrs
        let origin_offset = 11 + dies.len(); // header is 11 bytes
        uleb(&mut dies, 2);
        dies.extend_from_slice(b"inlined_target\0");
        uleb(&mut dies, 3);
        dies.extend_from_slice(&u32::try_from(origin_offset).unwrap().to_le_bytes());
        dies.extend_from_slice(&0x40u32.to_le_bytes());
        dies.extend_from_slice(&0x08u32.to_le_bytes());
        uleb(&mut dies, 0);

        let mut body = Vec::new();
        body.extend_from_slice(&4u16.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.push(4);
        body.extend_from_slice(&dies);
        let mut info = u32::try_from(body.len()).unwrap().to_le_bytes().to_vec();
        info.extend_from_slice(&body);

        let units = parse_units(&sections(&info, &abbrev)).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].functions.len(), 1);
        let f = &units[0].functions[0];
        assert_eq!(f.name.as_deref(), Some("inlined_target"));
        assert_eq!(f.low_pc, 0x40);
        assert_eq!(f.high_pc, 0x48);
    }
}

//! The merged address index and the public resolution entry point.
//!
//! Build once per module: every unit's line rows and function ranges are
//! merged into two sorted tables (rows by address, functions by low_pc).
//! After that the map is immutable — `resolve` takes `&self`, does two
//! binary searches, and never fails: an address nothing covers (runtime
//! trampolines, stripped units) resolves to `None`, not an error. The map
//! can therefore be shared by reference across threads symbolizing frames
//! concurrently, with no locking.

use log::{info, warn};

use super::demangle::demangle;
use super::paths;
use crate::domain::Result;
use crate::dwarf::info::{parse_units, UnitData};
use crate::dwarf::line::{parse_line_program, LineProgram, LineSections};
use crate::wasm::{scan_module, DebugSections};

/// A source location recovered for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// The outcome of resolving one address. Either half may be missing —
/// a location without an enclosing function, or a named function whose
/// line table was corrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub location: Option<Location>,
    /// Demangled where the scheme is recognized, raw otherwise.
    pub function: Option<String>,
}

/// Sentinel file id for rows whose file index fell outside the unit's table.
const NO_FILE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct IndexedRow {
    address: u64,
    file: u32,
    line: u32,
    column: u32,
    end_sequence: bool,
}

#[derive(Debug, Clone)]
struct FuncEntry {
    low_pc: u64,
    high_pc: u64,
    name: String,
}

/// Per-unit bookkeeping retained for the source report.
#[derive(Debug, Clone)]
pub(crate) struct UnitSummary {
    pub name: String,
    pub directory: String,
    pub file_start: u32,
    pub file_end: u32,
}

/// A row as handed to the report exporter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReportRow {
    pub file: u32,
    pub address: u64,
    pub line: u32,
    pub column: u32,
}

/// The queryable address→source index for one module.
pub struct SourceMap {
    rows: Vec<IndexedRow>,
    funcs: Vec<FuncEntry>,
    /// Running maximum of `funcs[..=i].high_pc`; bounds the backwards scan
    /// for the innermost enclosing range.
    cummax_high: Vec<u64>,
    files: Vec<String>,
    units: Vec<UnitSummary>,
}

impl SourceMap {
    /// Build from a raw `.wasm` byte stream.
    ///
    /// Addresses are biased by the code-section offset, so queries take the
    /// module-relative byte offsets runtimes report in traps.
    ///
    /// # Errors
    /// Fails only when the module itself cannot be framed or the very first
    /// compilation unit header is unreadable; unit-local corruption merely
    /// degrades coverage.
    pub fn from_module_bytes(bytes: &[u8]) -> Result<Self> {
        let scan = scan_module(bytes)?;
        Self::build(&scan.sections, scan.code_offset.unwrap_or(0))
    }

    /// Build from pre-extracted (name, bytes) custom sections, the boundary
    /// for hosts that already parsed the module. No address bias is applied.
    ///
    /// # Errors
    /// See [`SourceMap::from_module_bytes`].
    pub fn from_sections<'a, I>(sections: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        Self::build(&DebugSections::from_named(sections), 0)
    }

    fn build(sections: &DebugSections<'_>, bias: u64) -> Result<Self> {
        if sections.is_unusable() {
            info!("no usable debug sections; every address will resolve as unknown");
            return Ok(Self::empty());
        }

        let units = parse_units(sections)?;
        let line_sections = LineSections {
            line: sections.line,
            line_str: sections.line_str,
            strings: sections.strings,
        };

        let mut map = Self::empty();
        for unit in &units {
            map.merge_unit(unit, &line_sections, bias);
        }

        // A line-only module (no .debug_info) still gets its line table:
        // run the programs back to back from offset 0.
        if units.is_empty() && !sections.line.is_empty() {
            map.merge_anonymous_line_units(&line_sections, bias);
        }

        map.rows.sort_by_key(|row| (row.address, u8::from(!row.end_sequence)));
        map.funcs.sort_by_key(|f| f.low_pc);
        map.cummax_high = Vec::with_capacity(map.funcs.len());
        let mut max = 0u64;
        for f in &map.funcs {
            max = max.max(f.high_pc);
            map.cummax_high.push(max);
        }

        info!(
            "indexed {} units: {} line rows, {} function ranges, {} files",
            map.units.len(),
            map.rows.len(),
            map.funcs.len(),
            map.files.len()
        );
        Ok(map)
    }

    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            funcs: Vec::new(),
            cummax_high: Vec::new(),
            files: Vec::new(),
            units: Vec::new(),
        }
    }

    fn merge_unit(&mut self, unit: &UnitData, line_sections: &LineSections<'_>, bias: u64) {
        let file_start = u32::try_from(self.files.len()).unwrap_or(u32::MAX);

        let program = match unit.stmt_list {
            Some(offset) => match parse_line_program(line_sections, offset) {
                Ok(program) => Some(program),
                Err(err) => {
                    warn!("discarding line table of unit at {:#x}: {err}", unit.offset);
                    None
                }
            },
            None => None,
        };

        if let Some(program) = &program {
            let lookup = unit_file_lookup(unit, program);
            let base = self.files.len();
            self.files.extend(lookup);
            for row in &program.rows {
                let file = if row.end_sequence {
                    NO_FILE
                } else {
                    local_file_slot(program, row.file)
                        .and_then(|slot| u32::try_from(base + slot).ok())
                        .unwrap_or(NO_FILE)
                };
                self.rows.push(IndexedRow {
                    address: row.address.wrapping_add(bias),
                    file,
                    line: row.line,
                    column: row.column,
                    end_sequence: row.end_sequence,
                });
            }
        }

        for func in &unit.functions {
            let Some(name) = &func.name else { continue };
            self.funcs.push(FuncEntry {
                low_pc: func.low_pc.wrapping_add(bias),
                high_pc: func.high_pc.wrapping_add(bias),
                name: name.clone(),
            });
        }

        self.units.push(UnitSummary {
            name: unit.name.clone().unwrap_or_default(),
            directory: unit.comp_dir.clone().unwrap_or_default(),
            file_start,
            file_end: u32::try_from(self.files.len()).unwrap_or(u32::MAX),
        });
    }

    /// Fallback for modules carrying `.debug_line` but no `.debug_info`:
    /// line programs are laid out back to back, so walk them sequentially.
    fn merge_anonymous_line_units(&mut self, line_sections: &LineSections<'_>, bias: u64) {
        let mut offset = 0usize;
        let section_len = line_sections.line.len();
        while offset + 4 <= section_len {
            let len_bytes = &line_sections.line[offset..offset + 4];
            let unit_length =
                u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                    as usize;
            let next = offset + 4 + unit_length;

            let anonymous = UnitData { stmt_list: Some(offset), ..UnitData::default() };
            self.merge_unit(&anonymous, line_sections, bias);

            if next <= offset || next > section_len {
                break;
            }
            offset = next;
        }
    }

    /// True when the module yielded anything resolvable at all.
    #[must_use]
    pub fn has_debug_info(&self) -> bool {
        !(self.units.is_empty() && self.rows.is_empty() && self.funcs.is_empty())
    }

    /// Resolve a module-relative address to its source location and
    /// enclosing function. Total: unknown addresses yield `None`.
    #[must_use]
    pub fn resolve(&self, address: u64) -> Option<Resolution> {
        let location = self.lookup_location(address);
        let function = self.lookup_function(address).map(demangle);
        if location.is_none() && function.is_none() {
            return None;
        }
        Some(Resolution { location, function })
    }

    /// Greatest row at or below `address`, unless that row closes its run.
    fn lookup_location(&self, address: u64) -> Option<Location> {
        let idx = self.rows.partition_point(|row| row.address <= address);
        if idx == 0 {
            return None;
        }
        let row = &self.rows[idx - 1];
        if row.end_sequence {
            // At or past the exclusive end of a contiguous run.
            return None;
        }
        let file = self
            .files
            .get(row.file as usize)
            .cloned()
            .unwrap_or_else(|| "<unknown>".to_string());
        Some(Location { file, line: row.line, column: row.column })
    }

    /// Innermost function range containing `address`. Ranges nest for
    /// inlined calls; the tightest (smallest-extent) range wins.
    fn lookup_function(&self, address: u64) -> Option<&str> {
        let idx = self.funcs.partition_point(|f| f.low_pc <= address);
        let mut best: Option<(u64, usize)> = None;
        let mut j = idx;
        while j > 0 {
            j -= 1;
            if self.cummax_high[j] <= address {
                // Nothing at or before j reaches past the address.
                break;
            }
            let f = &self.funcs[j];
            if f.high_pc > address {
                let extent = f.high_pc - f.low_pc;
                if best.map_or(true, |(prev, _)| extent < prev) {
                    best = Some((extent, j));
                }
            }
        }
        best.map(|(_, j)| self.funcs[j].name.as_str())
    }

    pub(crate) fn units(&self) -> &[UnitSummary] {
        &self.units
    }

    pub(crate) fn files(&self) -> &[String] {
        &self.files
    }

    pub(crate) fn report_rows(&self) -> impl Iterator<Item = ReportRow> + '_ {
        self.rows.iter().filter(|row| !row.end_sequence && row.file != NO_FILE).map(|row| {
            ReportRow { file: row.file, address: row.address, line: row.line, column: row.column }
        })
    }
}

/// Resolve a unit's file table into full, normalized paths, indexed by the
/// raw file value the line program emits.
fn unit_file_lookup(unit: &UnitData, program: &LineProgram) -> Vec<String> {
    let comp_dir = unit.comp_dir.as_deref().unwrap_or("");
    let mut out = Vec::with_capacity(program.files.len() + 1);
    if program.file_base == 1 {
        // DWARF 2-4: file 0 names the unit's primary source file, which is
        // not an entry of the table.
        let primary = unit.name.as_deref().unwrap_or("<unknown>");
        out.push(paths::join(comp_dir, primary));
    }
    for entry in &program.files {
        let dir = dir_string(program, entry.dir_index, comp_dir);
        out.push(paths::join(&dir, &entry.path));
    }
    out
}

fn dir_string(program: &LineProgram, dir_index: u64, comp_dir: &str) -> String {
    let slot = if program.file_base == 1 {
        // DWARF 2-4: directory 0 is the compilation directory itself.
        if dir_index == 0 {
            return comp_dir.to_string();
        }
        usize::try_from(dir_index - 1).ok()
    } else {
        usize::try_from(dir_index).ok()
    };
    slot.and_then(|slot| program.include_dirs.get(slot))
        .map_or_else(|| comp_dir.to_string(), |dir| paths::join(comp_dir, dir))
}

/// Map the raw file value of a row to a slot in the unit's lookup table.
fn local_file_slot(program: &LineProgram, file: u64) -> Option<usize> {
    let table_len = if program.file_base == 1 {
        program.files.len() + 1
    } else {
        program.files.len()
    };
    usize::try_from(file).ok().filter(|&slot| slot < table_len)
}

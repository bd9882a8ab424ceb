//! Hand-assembled wasm/DWARF fixtures shared by the integration tests.
//!
//! Everything is encoded byte by byte so the tests exercise the real
//! decoders, not a second implementation of them.
#![allow(dead_code)]

pub fn uleb(out: &mut Vec<u8>, mut v: u64) {
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

pub fn sleb(out: &mut Vec<u8>, mut v: i64) {
    loop {
        let b = u8::try_from(v & 0x7f).unwrap();
        v >>= 7;
        let sign = b & 0x40 != 0;
        let done = (v == 0 && !sign) || (v == -1 && sign);
        out.push(if done { b } else { b | 0x80 });
        if done {
            break;
        }
    }
}

/// Builds one DWARF 4 `.debug_line` unit: fixed decode parameters
/// (line_base -5, line_range 14, opcode_base 13), caller-supplied
/// directory/file tables and opcode stream.
pub struct LineBuilder {
    pub include_dirs: Vec<&'static str>,
    /// (file name, directory index)
    pub files: Vec<(&'static str, u64)>,
    program: Vec<u8>,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self { include_dirs: Vec::new(), files: Vec::new(), program: Vec::new() }
    }

    pub fn set_address(&mut self, addr: u32) -> &mut Self {
        self.program.extend_from_slice(&[0x00, 0x05, 0x02]);
        self.program.extend_from_slice(&addr.to_le_bytes());
        self
    }

    pub fn advance_pc(&mut self, delta: u64) -> &mut Self {
        self.program.push(0x02);
        uleb(&mut self.program, delta);
        self
    }

    pub fn advance_line(&mut self, delta: i64) -> &mut Self {
        self.program.push(0x03);
        sleb(&mut self.program, delta);
        self
    }

    pub fn set_file(&mut self, file: u64) -> &mut Self {
        self.program.push(0x04);
        uleb(&mut self.program, file);
        self
    }

    pub fn set_column(&mut self, column: u64) -> &mut Self {
        self.program.push(0x05);
        uleb(&mut self.program, column);
        self
    }

    pub fn copy(&mut self) -> &mut Self {
        self.program.push(0x01);
        self
    }

    pub fn end_sequence(&mut self) -> &mut Self {
        self.program.extend_from_slice(&[0x00, 0x01, 0x01]);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut hdr = vec![
            1,    // minimum_instruction_length
            1,    // maximum_operations_per_instruction
            1,    // default_is_stmt
            0xfb, // line_base = -5
            14,   // line_range
            13,   // opcode_base
        ];
        hdr.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        for dir in &self.include_dirs {
            hdr.extend_from_slice(dir.as_bytes());
            hdr.push(0);
        }
        hdr.push(0);
        for (name, dir_index) in &self.files {
            hdr.extend_from_slice(name.as_bytes());
            hdr.push(0);
            uleb(&mut hdr, *dir_index);
            uleb(&mut hdr, 0); // mtime
            uleb(&mut hdr, 0); // size
        }
        hdr.push(0);

        let mut body = Vec::new();
        body.extend_from_slice(&4u16.to_le_bytes());
        body.extend_from_slice(&u32::try_from(hdr.len()).unwrap().to_le_bytes());
        body.extend_from_slice(&hdr);
        body.extend_from_slice(&self.program);

        let mut unit = u32::try_from(body.len()).unwrap().to_le_bytes().to_vec();
        unit.extend_from_slice(&body);
        unit
    }
}

/// Builds one DWARF 4 `.debug_info` unit (and its abbreviation fragment):
/// a compile_unit root plus leaf subprograms with [low_pc, low_pc + size).
pub struct InfoBuilder {
    pub name: &'static str,
    pub comp_dir: &'static str,
    pub stmt_list: Option<u32>,
    /// (function name, low_pc, size)
    pub funcs: Vec<(&'static str, u32, u32)>,
}

impl InfoBuilder {
    /// Returns `(unit bytes, abbrev fragment)`. The unit references its
    /// fragment at `abbrev_offset`, so concatenating fragments in the same
    /// order as units keeps the offsets honest.
    pub fn build(&self, abbrev_offset: u32) -> (Vec<u8>, Vec<u8>) {
        let mut abbrev = Vec::new();
        // code 1: compile_unit, has children
        abbrev.extend_from_slice(&[0x01, 0x11, 0x01]);
        abbrev.extend_from_slice(&[0x03, 0x08]); // name: string
        abbrev.extend_from_slice(&[0x1b, 0x08]); // comp_dir: string
        if self.stmt_list.is_some() {
            abbrev.extend_from_slice(&[0x10, 0x17]); // stmt_list: sec_offset
        }
        abbrev.extend_from_slice(&[0x11, 0x01]); // low_pc: addr
        abbrev.extend_from_slice(&[0x00, 0x00]);
        // code 2: subprogram, leaf
        abbrev.extend_from_slice(&[0x02, 0x2e, 0x00]);
        abbrev.extend_from_slice(&[0x03, 0x08]); // name: string
        abbrev.extend_from_slice(&[0x11, 0x01]); // low_pc: addr
        abbrev.extend_from_slice(&[0x12, 0x06]); // high_pc: data4 (offset)
        abbrev.extend_from_slice(&[0x00, 0x00]);
        abbrev.push(0x00);

        let mut dies = Vec::new();
        uleb(&mut dies, 1);
        dies.extend_from_slice(self.name.as_bytes());
        dies.push(0);
        dies.extend_from_slice(self.comp_dir.as_bytes());
        dies.push(0);
        if let Some(stmt) = self.stmt_list {
            dies.extend_from_slice(&stmt.to_le_bytes());
        }
        dies.extend_from_slice(&0u32.to_le_bytes()); // low_pc
        for (name, low, size) in &self.funcs {
            uleb(&mut dies, 2);
            dies.extend_from_slice(name.as_bytes());
            dies.push(0);
            dies.extend_from_slice(&low.to_le_bytes());
            dies.extend_from_slice(&size.to_le_bytes());
        }
        uleb(&mut dies, 0);

        let mut body = Vec::new();
        body.extend_from_slice(&4u16.to_le_bytes());
        body.extend_from_slice(&abbrev_offset.to_le_bytes());
        body.push(4); // address size
        body.extend_from_slice(&dies);

        let mut unit = u32::try_from(body.len()).unwrap().to_le_bytes().to_vec();
        unit.extend_from_slice(&body);
        (unit, abbrev)
    }
}

/// Frame custom sections (and optionally a code section) into a wasm
/// module. Returns the module bytes and the code-section payload offset.
pub fn wasm_module(sections: &[(&str, &[u8])], code: Option<&[u8]>) -> (Vec<u8>, u64) {
    let mut out = b"\0asm".to_vec();
    out.extend_from_slice(&1u32.to_le_bytes());

    let mut code_offset = 0;
    if let Some(code) = code {
        out.push(10);
        uleb(&mut out, code.len() as u64);
        code_offset = out.len() as u64;
        out.extend_from_slice(code);
    }
    for (name, body) in sections {
        let mut payload = Vec::new();
        uleb(&mut payload, name.len() as u64);
        payload.extend_from_slice(name.as_bytes());
        payload.extend_from_slice(body);
        out.push(0);
        uleb(&mut out, payload.len() as u64);
        out.extend_from_slice(&payload);
    }
    (out, code_offset)
}

/// The module used by most end-to-end tests: one unit named `main.rs` in
/// `/project`, file table `src/lib.rs`, line rows
/// `{0x10: line 5}, {0x20: line 7}, end_sequence at 0x30`, and a function
/// `foo` covering `[0x10, 0x30)`.
pub fn scenario_sections() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let mut line = LineBuilder::new();
    line.include_dirs.push("src");
    line.files.push(("lib.rs", 1));
    line.set_address(0x10)
        .advance_line(4)
        .copy()
        .advance_pc(0x10)
        .advance_line(2)
        .copy()
        .advance_pc(0x10)
        .end_sequence();
    let line = line.build();

    let info = InfoBuilder {
        name: "main.rs",
        comp_dir: "/project",
        stmt_list: Some(0),
        funcs: vec![("foo", 0x10, 0x20)],
    };
    let (info, abbrev) = info.build(0);
    (info, abbrev, line)
}

//! DWARF numeric constants, standard spellings.
//!
//! Only the subset the resolver consumes. Tag/attribute/form codes outside
//! this list still flow through the parsers as opaque numbers.
#![allow(non_upper_case_globals)]

// Unit types (DWARF 5, .debug_info header)
pub const DW_UT_compile: u8 = 0x01;
pub const DW_UT_partial: u8 = 0x03;

// Tags
pub const DW_TAG_compile_unit: u64 = 0x11;
pub const DW_TAG_inlined_subroutine: u64 = 0x1d;
pub const DW_TAG_subprogram: u64 = 0x2e;

// Attributes
pub const DW_AT_name: u64 = 0x03;
pub const DW_AT_stmt_list: u64 = 0x10;
pub const DW_AT_low_pc: u64 = 0x11;
pub const DW_AT_high_pc: u64 = 0x12;
pub const DW_AT_comp_dir: u64 = 0x1b;
pub const DW_AT_abstract_origin: u64 = 0x31;
pub const DW_AT_specification: u64 = 0x47;
pub const DW_AT_ranges: u64 = 0x55;
pub const DW_AT_linkage_name: u64 = 0x6e;
pub const DW_AT_str_offsets_base: u64 = 0x72;
pub const DW_AT_addr_base: u64 = 0x73;
pub const DW_AT_rnglists_base: u64 = 0x74;
// Pre-DWARF4 spelling of linkage_name, still emitted by some producers.
pub const DW_AT_MIPS_linkage_name: u64 = 0x2007;

// Forms
pub const DW_FORM_addr: u64 = 0x01;
pub const DW_FORM_block2: u64 = 0x03;
pub const DW_FORM_block4: u64 = 0x04;
pub const DW_FORM_data2: u64 = 0x05;
pub const DW_FORM_data4: u64 = 0x06;
pub const DW_FORM_data8: u64 = 0x07;
pub const DW_FORM_string: u64 = 0x08;
pub const DW_FORM_block: u64 = 0x09;
pub const DW_FORM_block1: u64 = 0x0a;
pub const DW_FORM_data1: u64 = 0x0b;
pub const DW_FORM_flag: u64 = 0x0c;
pub const DW_FORM_sdata: u64 = 0x0d;
pub const DW_FORM_strp: u64 = 0x0e;
pub const DW_FORM_udata: u64 = 0x0f;
pub const DW_FORM_ref_addr: u64 = 0x10;
pub const DW_FORM_ref1: u64 = 0x11;
pub const DW_FORM_ref2: u64 = 0x12;
pub const DW_FORM_ref4: u64 = 0x13;
pub const DW_FORM_ref8: u64 = 0x14;
pub const DW_FORM_ref_udata: u64 = 0x15;
pub const DW_FORM_indirect: u64 = 0x16;
pub const DW_FORM_sec_offset: u64 = 0x17;
pub const DW_FORM_exprloc: u64 = 0x18;
pub const DW_FORM_flag_present: u64 = 0x19;
pub const DW_FORM_strx: u64 = 0x1a;
pub const DW_FORM_addrx: u64 = 0x1b;
pub const DW_FORM_ref_sup4: u64 = 0x1c;
pub const DW_FORM_strp_sup: u64 = 0x1d;
pub const DW_FORM_data16: u64 = 0x1e;
pub const DW_FORM_line_strp: u64 = 0x1f;
pub const DW_FORM_ref_sig8: u64 = 0x20;
pub const DW_FORM_implicit_const: u64 = 0x21;
pub const DW_FORM_loclistx: u64 = 0x22;
pub const DW_FORM_rnglistx: u64 = 0x23;
pub const DW_FORM_ref_sup8: u64 = 0x24;
pub const DW_FORM_strx1: u64 = 0x25;
pub const DW_FORM_strx2: u64 = 0x26;
pub const DW_FORM_strx3: u64 = 0x27;
pub const DW_FORM_strx4: u64 = 0x28;
pub const DW_FORM_addrx1: u64 = 0x29;
pub const DW_FORM_addrx2: u64 = 0x2a;
pub const DW_FORM_addrx3: u64 = 0x2b;
pub const DW_FORM_addrx4: u64 = 0x2c;

// Line-number program: standard opcodes
pub const DW_LNS_copy: u8 = 0x01;
pub const DW_LNS_advance_pc: u8 = 0x02;
pub const DW_LNS_advance_line: u8 = 0x03;
pub const DW_LNS_set_file: u8 = 0x04;
pub const DW_LNS_set_column: u8 = 0x05;
pub const DW_LNS_negate_stmt: u8 = 0x06;
pub const DW_LNS_set_basic_block: u8 = 0x07;
pub const DW_LNS_const_add_pc: u8 = 0x08;
pub const DW_LNS_fixed_advance_pc: u8 = 0x09;
pub const DW_LNS_set_prologue_end: u8 = 0x0a;
pub const DW_LNS_set_epilogue_begin: u8 = 0x0b;
pub const DW_LNS_set_isa: u8 = 0x0c;

// Line-number program: extended opcodes
pub const DW_LNE_end_sequence: u8 = 0x01;
pub const DW_LNE_set_address: u8 = 0x02;
pub const DW_LNE_define_file: u8 = 0x03;
pub const DW_LNE_set_discriminator: u8 = 0x04;

// Line-number program header entry content types (DWARF 5)
pub const DW_LNCT_path: u64 = 0x01;
pub const DW_LNCT_directory_index: u64 = 0x02;

// Range-list entry kinds (DWARF 5, .debug_rnglists)
pub const DW_RLE_end_of_list: u8 = 0x00;
pub const DW_RLE_base_addressx: u8 = 0x01;
pub const DW_RLE_startx_endx: u8 = 0x02;
pub const DW_RLE_startx_length: u8 = 0x03;
pub const DW_RLE_offset_pair: u8 = 0x04;
pub const DW_RLE_base_address: u8 = 0x05;
pub const DW_RLE_start_end: u8 = 0x06;
pub const DW_RLE_start_length: u8 = 0x07;

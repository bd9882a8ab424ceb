//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "trapline",
    about = "Resolve WebAssembly code offsets to source locations via embedded DWARF",
    after_help = "\
EXAMPLES:
    trapline app.wasm                        Dump the full source report as JSON
    trapline app.wasm --addr 0x1a3f          Resolve one trap offset
    trapline app.wasm --addr 0x1a3f --addr 6721
                                             Resolve a whole stack of offsets
    wasm-pack build && trapline - < pkg/app_bg.wasm
                                             Read the module from stdin"
)]
pub struct Args {
    /// Path to the wasm module ("-" reads from stdin)
    #[arg(value_name = "MODULE")]
    pub module: PathBuf,

    /// Module-relative code offset to resolve (hex with 0x prefix, or
    /// decimal); may be repeated, one per stack frame
    #[arg(short, long = "addr", value_name = "OFFSET")]
    pub addrs: Vec<String>,

    /// Emit the full per-unit source report as JSON (the default when no
    /// --addr is given)
    #[arg(long)]
    pub json: bool,

    /// Write the JSON report to FILE instead of stdout
    #[arg(long, value_name = "FILE", requires = "json")]
    pub output: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

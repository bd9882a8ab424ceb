//! # trapline - Main Entry Point
//!
//! Two operational modes:
//! - **Report** (default, or `--json`): dump the module's whole line table
//!   as a JSON source report
//! - **Resolve** (`--addr <OFFSET>`...): symbolize individual trap offsets,
//!   one line per frame

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use trapline::cli::Args;
use trapline::export::SourceReport;
use trapline::symbolization::SourceMap;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.to_string().contains("invalid offset") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let bytes = read_module(&args.module)?;
    let map = SourceMap::from_module_bytes(&bytes)
        .with_context(|| format!("failed to load {}", args.module.display()))?;

    if !map.has_debug_info() && !args.quiet {
        eprintln!("warning: {} carries no debug information", args.module.display());
    }

    if args.addrs.is_empty() || args.json {
        emit_report(&args, &map)?;
    }
    for spec in &args.addrs {
        let addr = parse_offset(spec)?;
        print_resolution(&map, addr);
    }
    Ok(())
}

fn read_module(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read module from stdin")?;
        Ok(buffer)
    } else {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn emit_report(args: &Args, map: &SourceMap) -> Result<()> {
    let report = SourceReport::from_map(map);
    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Accept `0x`-prefixed hex or plain decimal offsets.
fn parse_offset(spec: &str) -> Result<u64> {
    let parsed = match spec.strip_prefix("0x").or_else(|| spec.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => spec.parse(),
    };
    parsed.map_err(|_| {
        anyhow::anyhow!("invalid offset '{spec}': expected hex (0x1a3f) or decimal (6719)")
    })
}

fn print_resolution(map: &SourceMap, addr: u64) {
    match map.resolve(addr) {
        Some(res) => {
            let function = res.function.as_deref().unwrap_or("<unknown>");
            match res.location {
                Some(loc) => {
                    println!("{addr:#x} {function} at {}:{}:{}", loc.file, loc.line, loc.column);
                }
                None => println!("{addr:#x} {function}"),
            }
        }
        None => println!("{addr:#x} <no debug info>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("0x10").unwrap(), 0x10);
        assert_eq!(parse_offset("0X1A").unwrap(), 0x1a);
        assert_eq!(parse_offset("42").unwrap(), 42);
        assert!(parse_offset("zzz").is_err());
        assert!(parse_offset("0xgg").is_err());
    }
}

// Licensed under the Apache-2.0 license

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regfile_compiler::{compile, RegFileConfig, RegFileIr};

/// Loads and compiles a configuration file, with the file name attached to
/// any failure. Shared by the other subcommands.
pub fn load(config: &Path) -> Result<RegFileIr> {
    let text = fs::read_to_string(config)
        .with_context(|| format!("failed to read {}", config.display()))?;
    let cfg = RegFileConfig::from_json(&text)
        .with_context(|| format!("failed to parse {}", config.display()))?;
    compile(&cfg).with_context(|| format!("failed to compile {}", config.display()))
}

pub fn run(config: &Path) -> Result<()> {
    let ir = load(config)?;
    println!("{}: ok", config.display());
    println!("  registers:  {}", ir.registers.len());
    println!("  fields:     {}", ir.descriptors.len());
    println!("  internals:  {}", ir.internals.len());
    println!("  I/O ports:  {}", ir.ports.len());
    println!("  interrupts: {}", ir.interrupts.len());
    if ir.defer_tags.defers_reads() || ir.defer_tags.defers_writes() {
        println!(
            "  defer tags: {} read, {} write",
            ir.defer_tags.read_count, ir.defer_tags.write_count
        );
    }
    Ok(())
}

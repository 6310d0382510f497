// Licensed under the Apache-2.0 license

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::check;

pub fn run(config: &Path, output: Option<&Path>) -> Result<()> {
    let ir = check::load(config)?;
    let json = ir.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("IR written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

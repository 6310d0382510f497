// Licensed under the Apache-2.0 license

use std::path::Path;

use anyhow::Result;

use crate::check;

pub fn run(config: &Path) -> Result<()> {
    let ir = check::load(config)?;
    print!("{}", ir.address_map());
    Ok(())
}

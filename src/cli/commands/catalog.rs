use anyhow::Context;
use std::path::Path;

use crate::access::RoleCatalog;

pub fn handle(file: &Path) -> anyhow::Result<()> {
    let catalog = RoleCatalog::from_file(file)
        .with_context(|| format!("role catalog {} is invalid", file.display()))?;
    println!("{}: {} roles OK", file.display(), catalog.len());
    Ok(())
}

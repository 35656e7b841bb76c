//! Database consistency check.

use super::Loader;
use anyhow::{bail, Result};
use std::path::Path;

/// Print type statistics and fail if any referenced name has no definition.
pub fn handle_check(loader: &Loader, xml: &Path) -> Result<()> {
    let db = loader.load(xml)?;
    let stats = db.stats();

    println!("Type database: {}", xml.display());
    println!("{}", "=".repeat(50));
    println!("Structs:       {}", stats.struct_count);
    println!("Unions:        {}", stats.union_count);
    println!("Enums:         {}", stats.enum_count);
    println!("Other:         {}", stats.other_count);
    println!("Total:         {}", stats.total());

    let dangling = db.unresolved_references();
    println!("\nUnresolved:    {}", dangling.len());
    for name in &dangling {
        println!("  {}", name);
    }

    if !dangling.is_empty() {
        bail!(
            "{} referenced type(s) missing from {}",
            dangling.len(),
            xml.display()
        );
    }

    Ok(())
}

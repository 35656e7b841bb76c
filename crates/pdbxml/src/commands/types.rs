//! Type listing and export commands.

use super::Loader;
use anyhow::{bail, Context, Result};
use pdbxml_types::{CType, TypeDatabase};
use std::fs;
use std::path::Path;

/// Which kinds of named type `list` prints. No flag set means all of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindFilter {
    pub structs: bool,
    pub unions: bool,
    pub enums: bool,
}

impl KindFilter {
    pub fn matches(&self, ty: &CType) -> bool {
        if !(self.structs || self.unions || self.enums) {
            return true;
        }
        match ty {
            CType::Struct(_) => self.structs,
            CType::Union(_) => self.unions,
            CType::Enum(_) => self.enums,
            _ => false,
        }
    }
}

/// Named types passing the filter, as `(kind, name)` in document order.
fn listing<'a>(db: &'a TypeDatabase, filter: KindFilter) -> Vec<(&'static str, &'a str)> {
    db.iter()
        .filter(|(_, ty)| filter.matches(ty))
        .map(|(name, ty)| (ty.kind_name(), name))
        .collect()
}

/// Print named types in document order.
pub fn handle_list(loader: &Loader, xml: &Path, filter: KindFilter) -> Result<()> {
    let db = loader.load(xml)?;
    let entries = listing(&db, filter);

    println!("Types in {} ({} shown):", xml.display(), entries.len());
    println!("{}", "=".repeat(50));
    for (kind, name) in entries {
        println!("  {:<10} {}", kind, name);
    }

    Ok(())
}

/// Print the C definition of one named type.
pub fn handle_show(loader: &Loader, xml: &Path, name: &str) -> Result<()> {
    let db = loader.load(xml)?;

    let Some(ty) = db.get_type(name) else {
        bail!("Type '{}' not found in {}", name, xml.display());
    };

    println!("Type: {} ({})", name, ty.kind_name());
    println!("{}", "=".repeat(40));
    println!("{}", db.format_type(name));

    let dangling: Vec<&str> = ty
        .named_references()
        .into_iter()
        .filter(|r| !db.has_type(r))
        .collect();
    if !dangling.is_empty() {
        println!("\n// Missing: {}", dangling.join(", "));
    }

    Ok(())
}

/// Write the decoded database as pretty JSON.
pub fn handle_json(loader: &Loader, xml: &Path, output: Option<&Path>) -> Result<()> {
    let db = loader.load(xml)?;
    let json = db.to_json().context("Failed to serialize type database")?;

    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("wrote {} types to {}", db.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

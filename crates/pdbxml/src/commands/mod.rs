//! Command handlers for the pdbxml CLI.
//!
//! Every command loads one document through [`Loader`], which carries the
//! global reader settings, and then works on the decoded database.

pub mod check;
pub mod types;

pub use check::handle_check;
pub use types::{handle_json, handle_list, handle_show, KindFilter};

use anyhow::{Context, Result};
use pdbxml_types::{Document, ReaderConfig, TypeDatabase};
use std::path::Path;

/// Loads type databases with the reader settings picked on the command line.
pub struct Loader {
    config: ReaderConfig,
}

impl Loader {
    pub fn new(strict: bool) -> Self {
        Self {
            config: ReaderConfig::new().strict_order(strict),
        }
    }

    /// Parse a document file and decode all of its named types.
    pub fn load(&self, path: &Path) -> Result<TypeDatabase> {
        let doc = Document::load(path)
            .with_context(|| format!("Failed to load type database: {}", path.display()))?;

        let db = TypeDatabase::from_document(&doc, self.config)
            .with_context(|| format!("Failed to decode types from {}", path.display()))?;

        log::info!("loaded {} named types from {}", db.len(), path.display());
        Ok(db)
    }
}

//! Type database for storing and looking up named types.
//!
//! The TypeDatabase is the default [`TypeStorage`]: it keeps named types in
//! document order and resolves the [`CType::Named`] references the reader
//! leaves behind.

use crate::document::Document;
use crate::error::ReadResult;
use crate::reader::{ReaderConfig, TypeReader, TypeStorage};
use crate::types::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// A database of named C types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDatabase {
    /// Named types in insertion order.
    types: IndexMap<String, CType>,
}

impl TypeStorage for TypeDatabase {
    fn add(&mut self, name: String, ty: CType) {
        self.add_type(name, ty);
    }
}

impl TypeDatabase {
    /// Create a new empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Loading ====================

    /// Decode every named type of a loaded document.
    pub fn from_document(doc: &Document, config: ReaderConfig) -> ReadResult<Self> {
        let mut db = Self::new();
        let mut reader = TypeReader::with_config(doc, config);
        let count = reader.read_to_storage(&mut db)?;
        log::debug!(
            "decoded {} named types ({} out-of-order lookups)",
            count,
            reader.fallbacks()
        );
        Ok(db)
    }

    /// Parse and decode document text.
    pub fn from_xml_str(text: &str) -> ReadResult<Self> {
        Self::from_document(&Document::parse(text)?, ReaderConfig::default())
    }

    /// Load and decode a document file.
    pub fn from_xml_file(path: impl AsRef<Path>) -> ReadResult<Self> {
        Self::from_document(&Document::load(path)?, ReaderConfig::default())
    }

    // ==================== Type Management ====================

    /// Add a named type. An existing type of the same name is replaced in place.
    pub fn add_type(&mut self, name: impl Into<String>, ty: CType) {
        let name = name.into();
        if self.types.contains_key(&name) {
            log::debug!("replacing existing type {}", name);
        }
        self.types.insert(name, ty);
    }

    /// Get a type by name.
    pub fn get_type(&self, name: &str) -> Option<&CType> {
        self.types.get(name)
    }

    /// Check if a type exists.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Get all type names in insertion order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|s| s.as_str())
    }

    /// Iterate over (name, type) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CType)> {
        self.types.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ==================== Reference Resolution ====================

    /// Follow named references until a concrete type.
    ///
    /// Returns None for a dangling name or a cycle made only of references.
    pub fn resolve<'a>(&'a self, ty: &'a CType) -> Option<&'a CType> {
        let mut current = ty;
        for _ in 0..=self.types.len() {
            match current {
                CType::Named(name) => current = self.types.get(name)?,
                _ => return Some(current),
            }
        }
        None
    }

    /// Look up a type by name and resolve it.
    pub fn resolve_name(&self, name: &str) -> Option<&CType> {
        self.resolve(self.get_type(name)?)
    }

    /// Names referenced by stored types that have no entry, sorted.
    pub fn unresolved_references(&self) -> Vec<&str> {
        let dangling: BTreeSet<&str> = self
            .types
            .values()
            .flat_map(|ty| ty.named_references())
            .filter(|name| !self.types.contains_key(*name))
            .collect();
        dangling.into_iter().collect()
    }

    // ==================== Formatting ====================

    /// Format a type as a C type definition.
    pub fn format_type(&self, name: &str) -> String {
        match self.get_type(name) {
            Some(CType::Enum(e)) => {
                let mut result = format!("enum {} {{\n", name);
                for (constant, value) in &e.values {
                    result.push_str(&format!("    {} = {},\n", constant, value));
                }
                result.push_str("};");
                result
            }
            Some(ty) => match members_of(ty) {
                Some((keyword, members)) => {
                    let mut result = format!("{} {} ", keyword, name);
                    write_members(&mut result, &members, 0);
                    result.push(';');
                    result
                }
                None => format!("typedef {};", ty.to_c_string(Some(name))),
            },
            None => format!("// Unknown type: {}", name),
        }
    }

    // ==================== Merging ====================

    /// Merge another database into this one.
    pub fn merge(&mut self, other: &TypeDatabase) {
        for (name, ty) in &other.types {
            self.add_type(name.clone(), ty.clone());
        }
    }

    // ==================== Serialization ====================

    /// Save database to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load database from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    // ==================== Statistics ====================

    /// Get database statistics.
    pub fn stats(&self) -> TypeDatabaseStats {
        let mut stats = TypeDatabaseStats::default();
        for ty in self.types.values() {
            match ty {
                CType::Struct(_) => stats.struct_count += 1,
                CType::Union(_) => stats.union_count += 1,
                CType::Enum(_) => stats.enum_count += 1,
                _ => stats.other_count += 1,
            }
        }
        stats.unresolved_count = self.unresolved_references().len();
        stats
    }
}

/// Keyword and (name, type) members of a struct or union.
fn members_of(ty: &CType) -> Option<(&'static str, Vec<(&str, &CType)>)> {
    match ty {
        CType::Struct(s) => Some((
            "struct",
            s.fields
                .iter()
                .map(|f| (f.name.as_str(), &f.field_type))
                .collect(),
        )),
        CType::Union(u) => Some((
            "union",
            u.members
                .iter()
                .map(|m| (m.name.as_str(), &m.member_type))
                .collect(),
        )),
        _ => None,
    }
}

/// Write a `{ ... }` member block, expanding anonymous composites inline.
fn write_members(out: &mut String, members: &[(&str, &CType)], depth: usize) {
    let indent = "    ".repeat(depth + 1);
    out.push_str("{\n");
    for &(name, ty) in members {
        out.push_str(&indent);
        match members_of(ty) {
            Some((keyword, inner)) => {
                out.push_str(keyword);
                out.push(' ');
                write_members(out, &inner, depth + 1);
                out.push_str(&format!(" {};\n", name));
            }
            None => out.push_str(&format!("{};\n", ty.to_c_string(Some(name)))),
        }
    }
    out.push_str(&"    ".repeat(depth));
    out.push('}');
}

/// Statistics about a type database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDatabaseStats {
    pub struct_count: usize,
    pub union_count: usize,
    pub enum_count: usize,
    pub other_count: usize,
    pub unresolved_count: usize,
}

impl TypeDatabaseStats {
    pub fn total(&self) -> usize {
        self.struct_count + self.union_count + self.enum_count + self.other_count
    }
}

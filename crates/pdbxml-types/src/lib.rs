//! # pdbxml-types
//!
//! Reader for debug symbol type databases exported as XML.
//!
//! This crate provides:
//! - C type representation (structs, unions, enums, bit-fields, pointers,
//!   arrays, function types, qualified types, named references)
//! - A decoder for the compact `base`/`attr`/`wrap` descriptor encoding
//! - A type database that stores named types and resolves references
//!
//! # Example
//!
//! ```ignore
//! use pdbxml_types::{Document, TypeDatabase, TypeReader};
//!
//! let doc = Document::load("ntdll.xml")?;
//! let mut db = TypeDatabase::new();
//! TypeReader::new(&doc).read_to_storage(&mut db)?;
//!
//! println!("{}", db.format_type("_LIST_ENTRY"));
//! for name in db.unresolved_references() {
//!     println!("dangling: {}", name);
//! }
//! ```

pub mod database;
pub mod document;
pub mod error;
pub mod locator;
pub mod reader;
pub mod registry;
pub mod types;

pub use database::{TypeDatabase, TypeDatabaseStats};
pub use document::{Document, Element};
pub use error::{ReadError, ReadResult};
pub use locator::Locator;
pub use reader::{ReaderConfig, TypeReader, TypeStorage, MAX_WRAP_TOKENS};
pub use registry::{CallConv, PrimitiveKind, TypeAttr, WrapOp};
pub use types::*;

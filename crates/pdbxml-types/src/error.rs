//! Error types for reading type databases.

use thiserror::Error;

/// Errors that can occur while loading or decoding a type database.
#[derive(Debug, Error)]
pub enum ReadError {
    /// A locator ran past the end of its section.
    #[error("{section} section has no record at position {index} (section length: {len})")]
    OutOfRange {
        section: &'static str,
        index: usize,
        len: usize,
    },

    /// The fallback scan did not find exactly one record with the wanted id.
    #[error("{section} section has {matches} records with id {id}, expected exactly one")]
    MalformedReference {
        section: &'static str,
        id: u32,
        matches: usize,
    },

    /// Record order diverged from reference order while strict ordering was requested.
    #[error("{section} section out of order: expected id {expected}, found id {found}")]
    SequenceMismatch {
        section: &'static str,
        expected: u32,
        found: u32,
    },

    /// A token that is not part of a closed registry.
    #[error("unknown {kind}: {token:?}")]
    UnknownToken { kind: &'static str, token: String },

    /// A record lacks a mandatory attribute.
    #[error("<{tag}> record is missing attribute '{attr}'")]
    MissingAttribute { tag: String, attr: &'static str },

    /// An attribute that should hold an integer does not.
    #[error("invalid number in '{attr}': {value:?}")]
    InvalidNumber { attr: &'static str, value: String },

    /// A base or wrap descriptor that does not follow its grammar.
    #[error("malformed descriptor {descriptor:?}: {reason}")]
    MalformedDescriptor {
        descriptor: String,
        reason: &'static str,
    },

    /// The document root has fewer than the three expected sections.
    #[error("document is missing section {index} (found {found} sections)")]
    MissingSection { index: usize, found: usize },

    /// The document text is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReadError {
    /// Creates a new UnknownToken error.
    pub fn unknown_token(kind: &'static str, token: impl Into<String>) -> Self {
        Self::UnknownToken {
            kind,
            token: token.into(),
        }
    }

    /// Creates a new MalformedDescriptor error.
    pub fn malformed(descriptor: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedDescriptor {
            descriptor: descriptor.into(),
            reason,
        }
    }
}

/// Result type for reading operations.
pub type ReadResult<T> = Result<T, ReadError>;

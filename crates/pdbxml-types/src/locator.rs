//! Sequential record lookup by id.
//!
//! The unnamed-type and function sections are emitted in the same order the
//! named types reference them, so the common case is a plain cursor step.
//! When a record's `id` does not match the requested one the locator logs a
//! warning and scans the whole section instead.

use crate::document::{parse_int, Element};
use crate::error::{ReadError, ReadResult};

/// Cursor over one document section.
#[derive(Debug)]
pub struct Locator<'d> {
    section: &'static str,
    records: &'d Element,
    next: usize,
    strict: bool,
    fallbacks: usize,
}

impl<'d> Locator<'d> {
    /// Create a locator positioned before the first record of `records`.
    pub fn new(section: &'static str, records: &'d Element) -> Self {
        Self {
            section,
            records,
            next: 0,
            strict: false,
            fallbacks: 0,
        }
    }

    /// Treat an out-of-order record as an error instead of scanning.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Advance the cursor and return the record with the given id.
    pub fn find(&mut self, id: u32) -> ReadResult<&'d Element> {
        let index = self.next;
        self.next += 1;

        let record = self
            .records
            .children
            .get(index)
            .ok_or(ReadError::OutOfRange {
                section: self.section,
                index,
                len: self.records.len(),
            })?;

        let found: u32 = record.int_attr("id")?;
        if found == id {
            return Ok(record);
        }

        if self.strict {
            return Err(ReadError::SequenceMismatch {
                section: self.section,
                expected: id,
                found,
            });
        }

        log::warn!(
            "{} section out of order: need id {} but record {} has id {}",
            self.section,
            id,
            index,
            found
        );
        self.fallbacks += 1;
        self.scan(id)
    }

    /// Find the single record carrying `id`, ignoring the cursor.
    fn scan(&self, id: u32) -> ReadResult<&'d Element> {
        let mut matches = self.records.children.iter().filter(|record| {
            record
                .attr("id")
                .and_then(|value| parse_int::<u32>("id", value).ok())
                == Some(id)
        });

        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record),
            (first, second) => Err(ReadError::MalformedReference {
                section: self.section,
                id,
                matches: first.iter().count() + second.iter().count() + matches.count(),
            }),
        }
    }

    /// Number of records consumed so far.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Number of lookups that needed the fallback scan.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    pub fn section(&self) -> &'static str {
        self.section
    }
}

//! Filter engine - criteria-based record selection
//!
//! A record passes iff all active criteria match (logical AND across
//! criteria; within the tag set, any overlap qualifies). Empty criteria
//! short-circuit to pass-all for that dimension, and the output preserves
//! input order, so filtering is idempotent.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::store::types::{Record, RecordType};

/// Filter criteria over a record collection
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Selected record types (empty = all)
    pub types: HashSet<RecordType>,
    /// Selected tag names (empty = all; any overlap qualifies)
    pub tags: HashSet<String>,
    /// Inclusive date range
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Case-insensitive substring matched against the description
    pub text: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a record type to the selected set
    pub fn with_type(mut self, record_type: RecordType) -> Self {
        self.types.insert(record_type);
        self
    }

    /// Builder: add a tag to the selected set
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder: set the inclusive date range
    pub fn with_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some((from, to));
        self
    }

    /// Builder: set the free-text criterion
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// True when no criterion is active
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.tags.is_empty()
            && self.date_range.is_none()
            && self.text.is_none()
    }

    /// Check a single record against all active criteria
    pub fn matches(&self, record: &Record) -> bool {
        if !self.types.is_empty() && !self.types.contains(&record.record_type) {
            return false;
        }

        if !self.tags.is_empty() && !record.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }

        if let Some((from, to)) = self.date_range {
            if record.date < from || record.date > to {
                return false;
            }
        }

        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = record
                .description
                .as_ref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }

        true
    }

    /// Select the matching subsequence, preserving input order
    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    /// Owned variant of [`apply`](Self::apply) for pipelines that consume
    /// the result
    pub fn apply_owned(&self, records: &[Record]) -> Vec<Record> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

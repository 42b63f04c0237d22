//! Splitting the `git log -z` stream into commit records

use crate::models::CommitRecord;

use super::repo_index::RepositoryIndex;

/// Separator between two records of the log stream
pub const RECORD_SEPARATOR: u8 = 0;

/// Candidate records in arrival order. An empty chunk after the final
/// separator is not a candidate.
pub fn split_records(raw: &[u8]) -> Vec<&[u8]> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut records: Vec<&[u8]> = raw.split(|b| *b == RECORD_SEPARATOR).collect();
    if records.last().map(|r| r.is_empty()).unwrap_or(false) {
        records.pop();
    }
    records
}

/// Feeds a completed log stream into the index.
///
/// Parsing stops at the first candidate that is not a valid record; every
/// record before it stays in the index.
pub struct LogStreamParser<F> {
    on_step: F,
}

impl<F: FnMut(usize)> LogStreamParser<F> {
    /// `on_step` is called with the running count after every inserted record
    pub fn new(on_step: F) -> Self {
        Self { on_step }
    }

    /// Returns the number of records inserted
    pub fn parse_into(&mut self, raw: &[u8], index: &mut RepositoryIndex) -> usize {
        let mut inserted = 0;

        for (position, candidate) in split_records(raw).into_iter().enumerate() {
            let Some(record) = CommitRecord::parse(candidate) else {
                tracing::debug!(
                    "Stopping at unparsable record {} of the log stream",
                    position + 1
                );
                break;
            };

            if index.insert_commit(record, position + 1) {
                inserted += 1;
                (self.on_step)(inserted);
            }
        }

        inserted
    }
}

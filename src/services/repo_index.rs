//! In-memory index of a loaded repository
//!
//! Holds the commit list in stream order, the optional pending-changes entry
//! in front of it, references keyed by target sha, and per-branch distances.
//! The loader clears and rebuilds it on every load.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::models::{
    CommitField, CommitRecord, LocalBranchDistances, PendingChangesRecord, Reference,
    ReferenceType, ZERO_SHA,
};

/// Counts describing the current snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub commits: usize,
    pub references: usize,
    pub local_branches: usize,
    pub untracked_files: usize,
    pub has_pending_changes: bool,
}

/// Commits, references and working-copy state of one repository
#[derive(Debug, Default)]
pub struct RepositoryIndex {
    commits: Vec<CommitRecord>,
    sha_map: HashMap<String, usize>,
    pending: Option<PendingChangesRecord>,
    references: HashMap<String, BTreeSet<Reference>>,
    branch_distances: HashMap<String, LocalBranchDistances>,
    untracked_files: Vec<String>,
    expected_commits: usize,
    /// Commits are only accepted between `configure` and the next `clear`
    configured: bool,
}

impl RepositoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything; commit inserts are refused until `configure` is called
    pub fn clear(&mut self) {
        self.commits.clear();
        self.sha_map.clear();
        self.pending = None;
        self.references.clear();
        self.branch_distances.clear();
        self.untracked_files.clear();
        self.expected_commits = 0;
        self.configured = false;
    }

    /// Prepare for `expected` commits of a new stream
    pub fn configure(&mut self, expected: usize) {
        tracing::debug!("Configuring the index for {} commits", expected);

        self.expected_commits = expected;
        self.commits.reserve(expected);
        self.sha_map.reserve(expected);
        self.configured = true;
    }

    /// Append a commit from the log stream.
    ///
    /// Returns false (and leaves the index untouched) when the index is not
    /// configured, the sha is already present or reserved, or `sequence`
    /// does not follow the previous commit.
    pub fn insert_commit(&mut self, mut record: CommitRecord, sequence: usize) -> bool {
        if !self.configured {
            tracing::warn!("The index is not configured, dropping commit {}", record.sha);
            return false;
        }

        if record.sha == ZERO_SHA || self.sha_map.contains_key(&record.sha) {
            tracing::info!("The commit with sha {} is already in the index", record.sha);
            return false;
        }

        let previous = self.commits.last().map(|c| c.sequence).unwrap_or(0);
        if sequence <= previous {
            tracing::warn!(
                "Commit {} has sequence {} after {}, dropping it",
                record.sha,
                sequence,
                previous
            );
            return false;
        }

        record.sequence = sequence;
        self.sha_map.insert(record.sha.clone(), self.commits.len());
        self.commits.push(record);
        true
    }

    pub fn insert_reference(&mut self, sha: &str, ref_type: ReferenceType, name: &str) {
        tracing::trace!("Adding {:?} {} at {}", ref_type, name, sha);

        self.references
            .entry(sha.to_string())
            .or_default()
            .insert(Reference {
                target_sha: sha.to_string(),
                ref_type,
                name: name.to_string(),
            });
    }

    pub fn insert_branch_distances(&mut self, name: &str, distances: LocalBranchDistances) {
        self.branch_distances.insert(name.to_string(), distances);
    }

    /// Install the pending-changes entry on top of `head_sha`.
    ///
    /// Clean state (nothing untracked, both diffs empty) removes the entry.
    pub fn set_pending_changes(
        &mut self,
        head_sha: Option<&str>,
        untracked_files: Vec<String>,
        unstaged_diff: String,
        staged_diff: String,
    ) {
        if untracked_files.is_empty()
            && unstaged_diff.trim().is_empty()
            && staged_diff.trim().is_empty()
        {
            self.pending = None;
            return;
        }

        tracing::debug!("Updating the pending changes on top of {:?}", head_sha);

        self.pending = Some(PendingChangesRecord::new(
            head_sha,
            untracked_files,
            unstaged_diff,
            staged_diff,
            chrono::Utc::now().timestamp(),
        ));
    }

    pub fn set_untracked_files(&mut self, files: Vec<String>) {
        self.untracked_files = files;
    }

    /// Number of rows, counting the pending-changes entry
    pub fn len(&self) -> usize {
        self.commits.len() + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real commits in stream order
    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn expected_commits(&self) -> usize {
        self.expected_commits
    }

    /// Row lookup; row 0 is the pending-changes entry when there is one
    pub fn commit_at(&self, row: usize) -> Option<&CommitRecord> {
        match &self.pending {
            Some(pending) if row == 0 => Some(&pending.commit),
            Some(_) => self.commits.get(row - 1),
            None => self.commits.get(row),
        }
    }

    /// Exact lookup, falling back to the first commit whose sha starts with `sha`
    pub fn commit(&self, sha: &str) -> Option<&CommitRecord> {
        if sha.is_empty() {
            return None;
        }

        if sha == ZERO_SHA {
            return self.pending.as_ref().map(|p| &p.commit);
        }

        if let Some(&pos) = self.sha_map.get(sha) {
            return self.commits.get(pos);
        }

        self.commits.iter().find(|c| c.sha.starts_with(sha))
    }

    /// Row of the commit with exactly this sha
    pub fn commit_position(&self, sha: &str) -> Option<usize> {
        let offset = usize::from(self.pending.is_some());

        if sha == ZERO_SHA {
            return self.pending.as_ref().map(|_| 0);
        }

        self.sha_map.get(sha).map(|pos| pos + offset)
    }

    pub fn pending_changes(&self) -> Option<&PendingChangesRecord> {
        self.pending.as_ref()
    }

    /// Tracked files differ from HEAD; untracked files alone do not count
    pub fn has_pending_local_changes(&self) -> bool {
        self.pending
            .as_ref()
            .map(PendingChangesRecord::has_tracked_changes)
            .unwrap_or(false)
    }

    pub fn untracked_files(&self) -> &[String] {
        &self.untracked_files
    }

    pub fn references(&self, sha: &str) -> Vec<&Reference> {
        self.references
            .get(sha)
            .map(|refs| refs.iter().collect())
            .unwrap_or_default()
    }

    /// `(sha, names)` for every commit carrying a reference of `ref_type`
    pub fn branches(&self, ref_type: ReferenceType) -> Vec<(String, Vec<String>)> {
        let mut branches: Vec<(String, Vec<String>)> = self
            .references
            .iter()
            .filter_map(|(sha, refs)| {
                let names: Vec<String> = refs
                    .iter()
                    .filter(|r| r.ref_type == ref_type)
                    .map(|r| r.name.clone())
                    .collect();
                (!names.is_empty()).then(|| (sha.clone(), names))
            })
            .collect();

        branches.sort();
        branches
    }

    pub fn tags(&self) -> Vec<(String, Vec<String>)> {
        self.branches(ReferenceType::Tag)
    }

    /// Sha the named local (or remote) branch points at
    pub fn commit_for_branch(&self, branch: &str, local: bool) -> Option<&str> {
        let wanted = if local {
            ReferenceType::LocalBranch
        } else {
            ReferenceType::RemoteBranch
        };

        self.references
            .values()
            .flat_map(|refs| refs.iter())
            .find(|r| r.ref_type == wanted && r.name == branch)
            .map(|r| r.target_sha.as_str())
    }

    pub fn branch_distances(&self, name: &str) -> LocalBranchDistances {
        self.branch_distances.get(name).copied().unwrap_or_default()
    }

    /// Search the loaded commits with filters
    pub fn search(
        &self,
        query: Option<&str>,
        author: Option<&str>,
        date_from: Option<i64>,
        date_to: Option<i64>,
        limit: Option<usize>,
    ) -> Vec<&CommitRecord> {
        let query_lower = query.map(|q| q.to_lowercase());
        let author_lower = author.map(|a| a.to_lowercase());
        let limit = limit.unwrap_or(500);

        self.commits
            .iter()
            .filter(|c| {
                // Query filter: subject, body and sha prefix
                if let Some(ref q) = query_lower {
                    if !c.subject.to_lowercase().contains(q.as_str())
                        && !c.body.to_lowercase().contains(q.as_str())
                        && !c.sha.starts_with(q.as_str())
                    {
                        return false;
                    }
                }

                if let Some(ref a) = author_lower {
                    if !c.author.name.to_lowercase().contains(a.as_str())
                        && !c.author.email.to_lowercase().contains(a.as_str())
                    {
                        return false;
                    }
                }

                if let Some(from) = date_from {
                    if c.author.timestamp < from {
                        return false;
                    }
                }
                if let Some(to) = date_to {
                    if c.author.timestamp > to {
                        return false;
                    }
                }

                true
            })
            .take(limit)
            .collect()
    }

    /// First row at or after `start` whose `field` contains `text`,
    /// wrapping around to the top once
    pub fn find_by_field(
        &self,
        field: CommitField,
        text: &str,
        start: usize,
    ) -> Option<&CommitRecord> {
        let rows = self.len();
        let matches = |row: &usize| {
            self.commit_at(*row)
                .map(|c| c.field(field).contains(text))
                .unwrap_or(false)
        };

        (start..rows)
            .find(matches)
            .or_else(|| (0..start.min(rows)).find(matches))
            .and_then(|row| self.commit_at(row))
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            commits: self.commits.len(),
            references: self.references.values().map(BTreeSet::len).sum(),
            local_branches: self.branch_distances.len(),
            untracked_files: self.untracked_files.len(),
            has_pending_changes: self.pending.is_some(),
        }
    }
}

/// Shared repository index state
pub type SharedRepositoryIndex = Arc<RwLock<RepositoryIndex>>;

pub fn create_shared_index() -> SharedRepositoryIndex {
    Arc::new(RwLock::new(RepositoryIndex::new()))
}

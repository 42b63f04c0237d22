//! The synthetic pending-changes entry

use serde::{Deserialize, Serialize};

use super::{parse_raw_diff, CommitRecord, FileStatus, Signature, WorkingFile, ZERO_SHA};

/// Uncommitted working-copy state, shown as a virtual commit on top of HEAD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChangesRecord {
    pub commit: CommitRecord,
    pub untracked_files: Vec<String>,
    /// Raw `diff-index HEAD` output (working tree vs HEAD)
    pub unstaged_diff: String,
    /// Raw `diff-index --cached HEAD` output (index vs HEAD)
    pub staged_diff: String,
}

impl PendingChangesRecord {
    pub fn new(
        head_sha: Option<&str>,
        untracked_files: Vec<String>,
        unstaged_diff: String,
        staged_diff: String,
        timestamp: i64,
    ) -> Self {
        let has_tracked_changes =
            !unstaged_diff.trim().is_empty() || !staged_diff.trim().is_empty();

        let signature = Signature {
            name: "-".to_string(),
            email: String::new(),
            timestamp,
        };

        let commit = CommitRecord {
            sha: ZERO_SHA.to_string(),
            parents: head_sha.map(|sha| vec![sha.to_string()]).unwrap_or_default(),
            author: signature.clone(),
            committer: signature,
            subject: if has_tracked_changes {
                "Local changes".to_string()
            } else {
                "No local changes".to_string()
            },
            body: String::new(),
            boundary: false,
            sequence: 0,
        };

        Self {
            commit,
            untracked_files,
            unstaged_diff,
            staged_diff,
        }
    }

    /// Parent commit the changes are relative to
    pub fn head_sha(&self) -> Option<&str> {
        self.commit.parents.first().map(String::as_str)
    }

    /// Tracked files differ from HEAD in the working tree or the index
    pub fn has_tracked_changes(&self) -> bool {
        !self.unstaged_diff.trim().is_empty() || !self.staged_diff.trim().is_empty()
    }

    /// Changed files: working-tree changes, then untracked files, then
    /// changes that only exist in the index. Files present in the staged
    /// diff are flagged as staged.
    pub fn files(&self) -> Vec<WorkingFile> {
        let staged = parse_raw_diff(&self.staged_diff);
        let mut files = parse_raw_diff(&self.unstaged_diff);

        for file in files.iter_mut() {
            if let Some(cached) = staged.iter().find(|s| s.path == file.path) {
                file.staged = true;
                file.is_conflicted |= cached.is_conflicted;
            }
        }

        files.extend(self.untracked_files.iter().map(|path| WorkingFile {
            path: path.clone(),
            old_path: None,
            status: FileStatus::Untracked,
            staged: false,
            is_conflicted: false,
        }));

        for cached in staged {
            if !files.iter().any(|f| f.path == cached.path) {
                files.push(WorkingFile {
                    staged: true,
                    ..cached
                });
            }
        }

        files
    }
}

//! Working-copy diff models

use serde::{Deserialize, Serialize};

/// File status in the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    New,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Typechange,
    Conflicted,
}

impl From<char> for FileStatus {
    fn from(c: char) -> Self {
        match c {
            'A' => FileStatus::New,
            'D' => FileStatus::Deleted,
            'R' => FileStatus::Renamed,
            'C' => FileStatus::Copied,
            'T' => FileStatus::Typechange,
            'U' => FileStatus::Conflicted,
            _ => FileStatus::Modified,
        }
    }
}

/// One changed entry of the pending-changes record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingFile {
    pub path: String,
    pub old_path: Option<String>,
    pub status: FileStatus,
    /// The change is (also) present in the index
    pub staged: bool,
    pub is_conflicted: bool,
}

/// Parse `git diff-index` raw output.
///
/// Lines look like `:100644 100644 <sha> <sha> M\tpath`; renames and copies
/// carry a score and two paths (`R086\told\tnew`).
pub fn parse_raw_diff(raw: &str) -> Vec<WorkingFile> {
    raw.lines()
        .filter_map(|line| {
            let line = line.strip_prefix(':')?;
            let (meta, paths) = line.split_once('\t')?;
            let status = meta.split_whitespace().last()?.chars().next()?;

            let (old_path, path) = match paths.split_once('\t') {
                Some((from, to)) => (Some(from.to_string()), to.to_string()),
                None => (None, paths.to_string()),
            };

            let status = FileStatus::from(status);
            Some(WorkingFile {
                path,
                old_path,
                status,
                staged: false,
                is_conflicted: status == FileStatus::Conflicted,
            })
        })
        .collect()
}

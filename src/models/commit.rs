//! Commit models and the single-record log parser

use serde::{Deserialize, Serialize};

/// Reserved id of the synthetic pending-changes entry
pub const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

/// Separator between the fields of one log record (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Pretty-format handed to `git log`.
///
/// Field order: mark, sha, parents, committer name, committer email,
/// committer time, author name, author email, author time, subject, body.
/// The body is last so stray separators inside it cannot shift other fields.
pub const LOG_FORMAT: &str = "%m%x1f%H%x1f%P%x1f%cn%x1f%ce%x1f%ct%x1f%an%x1f%ae%x1f%at%x1f%s%x1f%b";

const LOG_FIELD_COUNT: usize = 11;

/// Mark emitted by `%m` for commits outside the requested range
const BOUNDARY_MARK: &str = "-";

/// Returns true for a full 40-character hexadecimal object id
pub fn is_sha(text: &str) -> bool {
    text.len() == 40 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Git signature (author/committer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub timestamp: i64,
}

/// One commit of the loaded history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub sha: String,
    pub parents: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
    pub subject: String,
    pub body: String,
    /// The commit lies outside the requested range
    pub boundary: bool,
    /// 1-based position in the log stream, 0 for the pending-changes entry
    pub sequence: usize,
}

impl CommitRecord {
    /// Parse one NUL-delimited record of the `LOG_FORMAT` stream.
    ///
    /// Returns `None` for anything that is not a complete record, including
    /// the empty trailing entry git leaves after the last separator.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_start_matches(|c: char| c == '\n' || c == '\r');

        let fields: Vec<&str> = text.splitn(LOG_FIELD_COUNT, FIELD_SEPARATOR).collect();
        if fields.len() != LOG_FIELD_COUNT {
            return None;
        }

        let sha = fields[1].trim();
        if !is_sha(sha) {
            return None;
        }

        let parents: Vec<String> = fields[2].split_whitespace().map(str::to_string).collect();
        if !parents.iter().all(|p| is_sha(p)) {
            return None;
        }

        let committer = Signature {
            name: fields[3].to_string(),
            email: fields[4].to_string(),
            timestamp: fields[5].trim().parse().ok()?,
        };
        let author = Signature {
            name: fields[6].to_string(),
            email: fields[7].to_string(),
            timestamp: fields[8].trim().parse().ok()?,
        };

        Some(CommitRecord {
            sha: sha.to_string(),
            parents,
            author,
            committer,
            subject: fields[9].to_string(),
            body: fields[10].trim_end().to_string(),
            boundary: fields[0].trim() == BOUNDARY_MARK,
            sequence: 0,
        })
    }

    pub fn short_sha(&self) -> &str {
        &self.sha[..7.min(self.sha.len())]
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_pending_changes(&self) -> bool {
        self.sha == ZERO_SHA
    }

    /// Text of the given field, as used by field searches
    pub fn field(&self, field: CommitField) -> &str {
        match field {
            CommitField::Sha => &self.sha,
            CommitField::Subject => &self.subject,
            CommitField::Author => &self.author.name,
            CommitField::Body => &self.body,
        }
    }
}

/// Searchable commit fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitField {
    Sha,
    Subject,
    Author,
    Body,
}

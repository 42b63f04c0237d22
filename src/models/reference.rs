//! Reference models

use serde::{Deserialize, Serialize};

/// Kind of a named reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceType {
    Tag,
    LocalBranch,
    RemoteBranch,
}

/// A branch or tag pointing at a commit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub target_sha: String,
    pub ref_type: ReferenceType,
    /// Short name, e.g. `main`, `origin/main` or `v1.0`
    pub name: String,
}

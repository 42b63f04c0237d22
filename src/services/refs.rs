//! Loading branches and tags from `git show-ref -d`

use std::path::Path;

use crate::models::{is_sha, LocalBranchDistances, Reference, ReferenceType};
use crate::utils::GitCommand;

use super::divergence::BranchDivergenceProbe;
use super::git_runner::GitRunner;
use super::repo_index::RepositoryIndex;

const PEEL_SUFFIX: &str = "^{}";
const TAGS_PREFIX: &str = "refs/tags/";
const HEADS_PREFIX: &str = "refs/heads/";
const REMOTES_PREFIX: &str = "refs/remotes/";

/// Classify one `<sha> <ref-path>` line. Returns `None` for lines that are
/// malformed or name a ref the index does not track.
pub fn classify_reference(line: &str) -> Option<Reference> {
    let (sha, path) = line.trim_end().split_once(' ')?;
    if !is_sha(sha) {
        return None;
    }

    let (ref_type, name) = if let Some(tag) = path.strip_prefix(TAGS_PREFIX) {
        (
            ReferenceType::Tag,
            tag.strip_suffix(PEEL_SUFFIX).unwrap_or(tag),
        )
    } else if path.ends_with(PEEL_SUFFIX) {
        return None;
    } else if let Some(branch) = path.strip_prefix(HEADS_PREFIX) {
        (ReferenceType::LocalBranch, branch)
    } else if let Some(remote) = path.strip_prefix(REMOTES_PREFIX) {
        // A remote's symbolic HEAD is not a branch
        if remote.rsplit('/').next() == Some("HEAD") {
            return None;
        }
        (ReferenceType::RemoteBranch, remote)
    } else {
        return None;
    };

    if name.is_empty() {
        return None;
    }

    Some(Reference {
        target_sha: sha.to_string(),
        ref_type,
        name: name.to_string(),
    })
}

/// References and branch distances collected after the history is loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceScan {
    pub references: Vec<Reference>,
    pub distances: Vec<(String, LocalBranchDistances)>,
}

impl ReferenceScan {
    pub fn apply(self, index: &mut RepositoryIndex) {
        for reference in &self.references {
            index.insert_reference(&reference.target_sha, reference.ref_type, &reference.name);
        }

        for (branch, distances) in self.distances {
            index.insert_branch_distances(&branch, distances);
        }
    }
}

/// Run `show-ref -d`, classify every line and probe each local branch.
/// A failed `show-ref` (a repository without refs) yields an empty scan.
pub fn scan_references(
    runner: &dyn GitRunner,
    workdir: &Path,
    probe: &BranchDivergenceProbe<'_>,
) -> ReferenceScan {
    tracing::debug!("Loading references");

    let Some(output) = runner.run(workdir, &GitCommand::ShowRefs).into_success() else {
        tracing::debug!("No references found");
        return ReferenceScan::default();
    };

    let mut scan = ReferenceScan::default();

    for reference in output.lines().filter_map(classify_reference) {
        if reference.ref_type == ReferenceType::LocalBranch {
            let distances = probe.probe(&reference.name);
            scan.distances.push((reference.name.clone(), distances));
        }

        scan.references.push(reference);
    }

    scan
}

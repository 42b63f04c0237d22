//! Ahead/behind counts of local branches

use std::path::Path;

use crate::models::{Comparison, LocalBranchDistances};
use crate::utils::GitCommand;

use super::git_runner::GitRunner;

/// Compares local branches against the local and remote default branches
pub struct BranchDivergenceProbe<'a> {
    runner: &'a dyn GitRunner,
    workdir: &'a Path,
    /// e.g. `master`
    local_baseline: String,
    /// e.g. `origin/master`
    remote_baseline: String,
}

impl<'a> BranchDivergenceProbe<'a> {
    pub fn new(
        runner: &'a dyn GitRunner,
        workdir: &'a Path,
        local_baseline: impl Into<String>,
        remote_baseline: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            workdir,
            local_baseline: local_baseline.into(),
            remote_baseline: remote_baseline.into(),
        }
    }

    /// One `rev-list --left-right --count` run. A failed run (missing
    /// baseline, unknown branch) is `Unavailable`, never an error.
    pub fn compare(&self, baseline: &str, branch: &str) -> Comparison {
        let command = GitCommand::AheadBehind {
            baseline: baseline.to_string(),
            branch: branch.to_string(),
        };

        match self.runner.run(self.workdir, &command).into_success() {
            Some(output) => Comparison::parse(&output),
            None => {
                tracing::debug!("No {} baseline for {}", baseline, branch);
                Comparison::Unavailable
            }
        }
    }

    pub fn probe(&self, branch: &str) -> LocalBranchDistances {
        let master = self.compare(&self.local_baseline, branch);
        let origin = self.compare(&self.remote_baseline, branch);

        LocalBranchDistances::from_comparisons(master, origin)
    }
}

//! Working-copy state behind the pending-changes entry

use std::path::Path;

use crate::utils::GitCommand;

use super::git_runner::GitRunner;
use super::repo_index::RepositoryIndex;

/// Repository-local exclude file, relative to the root
const INFO_EXCLUDE: &str = ".git/info/exclude";

/// Uncommitted state of the working copy relative to HEAD
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingCopyState {
    /// `None` for a repository without commits
    pub head_sha: Option<String>,
    pub untracked_files: Vec<String>,
    pub unstaged_diff: String,
    pub staged_diff: String,
}

impl WorkingCopyState {
    /// Anything worth a pending-changes entry
    pub fn is_dirty(&self) -> bool {
        !self.untracked_files.is_empty()
            || !self.unstaged_diff.trim().is_empty()
            || !self.staged_diff.trim().is_empty()
    }

    /// Store the untracked list and, when dirty, the pending-changes entry
    pub fn apply(self, index: &mut RepositoryIndex) {
        index.set_untracked_files(self.untracked_files.clone());

        if self.is_dirty() {
            index.set_pending_changes(
                self.head_sha.as_deref(),
                self.untracked_files,
                self.unstaged_diff,
                self.staged_diff,
            );
        }
    }
}

pub struct WorkingCopyStateBuilder<'a> {
    runner: &'a dyn GitRunner,
    root: &'a Path,
    honor_info_exclude: bool,
}

impl<'a> WorkingCopyStateBuilder<'a> {
    pub fn new(runner: &'a dyn GitRunner, root: &'a Path) -> Self {
        Self {
            runner,
            root,
            honor_info_exclude: true,
        }
    }

    pub fn honor_info_exclude(mut self, honor: bool) -> Self {
        self.honor_info_exclude = honor;
        self
    }

    pub fn build(&self) -> WorkingCopyState {
        let untracked_files = self.untracked_files();

        let Some(head_sha) = self.head_sha() else {
            tracing::debug!("HEAD does not resolve, skipping the diffs");
            return WorkingCopyState {
                head_sha: None,
                untracked_files,
                ..Default::default()
            };
        };

        let unstaged_diff = self.diff_against(&head_sha, false);
        let staged_diff = self.diff_against(&head_sha, true);

        WorkingCopyState {
            head_sha: Some(head_sha),
            untracked_files,
            unstaged_diff,
            staged_diff,
        }
    }

    pub fn untracked_files(&self) -> Vec<String> {
        let exclude_file = self.root.join(INFO_EXCLUDE);
        let exclude_from = (self.honor_info_exclude && exclude_file.is_file()).then_some(exclude_file);

        let command = GitCommand::UntrackedFiles { exclude_from };
        match self.runner.run(self.root, &command).into_success() {
            Some(output) => output
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            None => {
                tracing::warn!("Could not list untracked files");
                Vec::new()
            }
        }
    }

    fn head_sha(&self) -> Option<String> {
        self.runner
            .run(self.root, &GitCommand::HeadSha)
            .into_success()
            .map(|output| output.trim().to_string())
            .filter(|sha| !sha.is_empty())
    }

    fn diff_against(&self, base: &str, cached: bool) -> String {
        let command = GitCommand::DiffIndex {
            base: base.to_string(),
            cached,
        };

        self.runner
            .run(self.root, &command)
            .into_success()
            .unwrap_or_else(|| {
                tracing::warn!("{} failed, treating it as no changes", command);
                String::new()
            })
    }
}

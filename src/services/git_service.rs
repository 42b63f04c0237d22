//! Git service for managing repository state

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{LoaderError, Result};
use crate::utils::GitCommand;

use super::git_runner::GitRunner;

/// Tracks the working directory and the checked-out branch
pub struct GitService {
    runner: Arc<dyn GitRunner>,
    working_dir: RwLock<Option<PathBuf>>,
    current_branch: RwLock<Option<String>>,
}

impl GitService {
    pub fn new(runner: Arc<dyn GitRunner>) -> Self {
        Self {
            runner,
            working_dir: RwLock::new(None),
            current_branch: RwLock::new(None),
        }
    }

    /// Set the working directory; relative paths are made absolute
    pub fn set_working_dir(&self, path: &Path) -> Result<()> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let mut current = self
            .working_dir
            .write()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        *current = Some(normalize(&absolute));
        Ok(())
    }

    /// Get the working directory
    pub fn working_dir(&self) -> Result<Option<PathBuf>> {
        let current = self
            .working_dir
            .read()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        Ok(current.clone())
    }

    pub fn clear_working_dir(&self) -> Result<()> {
        let mut current = self
            .working_dir
            .write()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        *current = None;

        let mut branch = self
            .current_branch
            .write()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        *branch = None;
        Ok(())
    }

    /// Resolve the repository root from the working directory and make it
    /// the new working directory
    pub fn resolve_repo_root(&self) -> Result<PathBuf> {
        let workdir = self.working_dir()?.ok_or(LoaderError::NoWorkingDirectory)?;

        let prefix = self
            .runner
            .run(&workdir, &GitCommand::ShowRootPrefix)
            .into_success()
            .ok_or_else(|| LoaderError::NotARepository(workdir.display().to_string()))?;

        let root = normalize(&workdir.join(prefix.trim()));
        tracing::debug!("Repository root resolved to {}", root.display());

        let mut current = self
            .working_dir
            .write()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        *current = Some(root.clone());
        Ok(root)
    }

    /// Re-read the checked-out branch. Detached HEAD and unborn
    /// repositories leave it unset.
    pub fn update_current_branch(&self) -> Result<Option<String>> {
        let workdir = self.working_dir()?.ok_or(LoaderError::NoWorkingDirectory)?;

        let branch = self
            .runner
            .run(&workdir, &GitCommand::CurrentBranch)
            .into_success()
            .map(|output| output.trim().to_string())
            .filter(|name| !name.is_empty() && name != "HEAD");

        let mut current = self
            .current_branch
            .write()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        current.clone_from(&branch);
        Ok(branch)
    }

    pub fn current_branch(&self) -> Result<Option<String>> {
        let current = self
            .current_branch
            .read()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))?;
        Ok(current.clone())
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

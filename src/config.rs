//! Loader configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

const CONFIG_FILE: &str = "loader_config.json";

/// Settings for one repository loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Directory inside the repository to load; the loader refuses to start
    /// without one
    pub working_dir: Option<PathBuf>,
    /// Git executable to run
    pub git_binary: String,
    /// Local baseline for branch distances
    pub default_branch: String,
    /// Remote whose copy of `default_branch` is the second baseline
    pub remote: String,
    /// Pass `.git/info/exclude` to the untracked-file listing
    pub honor_info_exclude: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            git_binary: "git".to_string(),
            default_branch: "master".to_string(),
            remote: "origin".to_string(),
            honor_info_exclude: true,
        }
    }
}

impl LoaderConfig {
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// `<remote>/<default_branch>`, e.g. `origin/master`
    pub fn remote_baseline(&self) -> String {
        format!("{}/{}", self.remote, self.default_branch)
    }

    /// Load configuration from disk
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load from the platform config directory, or defaults when the
    /// platform has none
    pub fn load_default() -> Result<Self> {
        match default_config_dir() {
            Some(dir) => Self::load(&dir),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to disk
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(CONFIG_FILE), contents)?;
        Ok(())
    }
}

/// Platform config directory for the loader, e.g. `~/.config/revloader`
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("revloader"))
}

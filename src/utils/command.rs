//! Command utilities for spawning git
//!
//! This module provides helpers to create commands that don't show
//! console windows on Windows, and the typed descriptions of every git
//! invocation the loader issues.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use crate::models::LOG_FORMAT;

/// Creates a Command with platform-specific settings to hide console windows.
///
/// On Windows, this sets the CREATE_NO_WINDOW flag to prevent CMD popups.
/// On other platforms, it returns a standard Command.
pub fn create_command(program: &str) -> Command {
    let mut cmd = Command::new(program);

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        // CREATE_NO_WINDOW = 0x08000000
        cmd.creation_flags(0x08000000);
    }

    // Never prompt for credentials, never take the index lock for reads
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.env("GIT_OPTIONAL_LOCKS", "0");

    cmd
}

/// Which refs the history walk starts from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogScope {
    All,
    Branch(String),
}

/// Every git invocation issued while loading a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitCommand {
    /// `rev-parse --show-cdup`: path from the working dir up to the root
    ShowRootPrefix,
    /// `rev-parse --abbrev-ref HEAD`
    CurrentBranch,
    /// Date-ordered, boundary-marked, NUL-separated history in `LOG_FORMAT`
    Log { scope: LogScope },
    /// `show-ref -d`: every ref, with peeled tags
    ShowRefs,
    /// `rev-parse --revs-only HEAD`
    HeadSha,
    /// Raw diff of the working tree (or index when `cached`) against `base`
    DiffIndex { base: String, cached: bool },
    UntrackedFiles { exclude_from: Option<PathBuf> },
    /// `rev-list --left-right --count <baseline>...<branch>`
    AheadBehind { baseline: String, branch: String },
}

impl GitCommand {
    pub fn args(&self) -> Vec<String> {
        match self {
            GitCommand::ShowRootPrefix => vec!["rev-parse".into(), "--show-cdup".into()],
            GitCommand::CurrentBranch => {
                vec!["rev-parse".into(), "--abbrev-ref".into(), "HEAD".into()]
            }
            GitCommand::Log { scope } => {
                let mut args: Vec<String> = vec![
                    "log".into(),
                    "--date-order".into(),
                    "--no-color".into(),
                    "--parents".into(),
                    "--boundary".into(),
                    "-z".into(),
                    format!("--pretty=format:{}", LOG_FORMAT),
                ];
                match scope {
                    LogScope::All => args.push("--all".into()),
                    LogScope::Branch(branch) => {
                        // A revision, even when a worktree path shares its name
                        args.push(branch.clone());
                        args.push("--".into());
                    }
                }
                args
            }
            GitCommand::ShowRefs => vec!["show-ref".into(), "-d".into()],
            GitCommand::HeadSha => vec!["rev-parse".into(), "--revs-only".into(), "HEAD".into()],
            GitCommand::DiffIndex { base, cached } => {
                let mut args: Vec<String> = vec!["diff-index".into()];
                if *cached {
                    args.push("--cached".into());
                }
                args.push(base.clone());
                args
            }
            GitCommand::UntrackedFiles { exclude_from } => {
                let mut args: Vec<String> = vec!["ls-files".into(), "--others".into()];
                if let Some(path) = exclude_from {
                    args.push(format!("--exclude-from={}", path.display()));
                }
                args.push("--exclude-per-directory=.gitignore".into());
                args
            }
            GitCommand::AheadBehind { baseline, branch } => vec![
                "rev-list".into(),
                "--left-right".into(),
                "--count".into(),
                format!("{}...{}", baseline, branch),
            ],
        }
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.args().join(" "))
    }
}

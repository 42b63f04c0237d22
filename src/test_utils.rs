//! Test utilities: log fixtures, a scripted git runner and temporary
//! git repositories

#![cfg(test)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::error::{LoaderError, Result};
use crate::models::{CommitRecord, Signature, FIELD_SEPARATOR};
use crate::services::cancellation::CancellationToken;
use crate::services::git_runner::{CommandOutput, GitRunner, StreamChunk};
use crate::utils::GitCommand;

const TEST_TIMESTAMP: i64 = 1_700_000_000;

/// A 40-character sha derived from `n`
pub fn sha(n: u64) -> String {
    format!("{:040x}", n)
}

/// One record of the log stream, as git prints it for `LOG_FORMAT`
pub fn format_log_record(sha: &str, parents: &[&str], subject: &str, body: &str) -> String {
    let timestamp = TEST_TIMESTAMP.to_string();
    let parents = parents.join(" ");
    let fields = [
        ">",
        sha,
        parents.as_str(),
        "Test User",
        "test@example.com",
        timestamp.as_str(),
        "Test User",
        "test@example.com",
        timestamp.as_str(),
        subject,
        body,
    ];
    let separator = FIELD_SEPARATOR.to_string();
    fields.join(separator.as_str())
}

pub fn commit_record(n: u64, parents: &[u64], subject: &str) -> CommitRecord {
    let signature = Signature {
        name: "Test User".to_string(),
        email: "test@example.com".to_string(),
        timestamp: TEST_TIMESTAMP + n as i64,
    };

    CommitRecord {
        sha: sha(n),
        parents: parents.iter().map(|p| sha(*p)).collect(),
        author: signature.clone(),
        committer: signature,
        subject: subject.to_string(),
        body: String::new(),
        boundary: false,
        sequence: 0,
    }
}

/// Whether a git binary is on PATH
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// What `FakeGitRunner::stream` plays back
#[derive(Debug, Clone)]
pub enum ScriptedStream {
    Chunks { chunks: Vec<Vec<u8>>, success: bool },
    /// Sends the chunks, then waits for cancellation without finishing
    Hang { chunks: Vec<Vec<u8>> },
    SpawnError,
}

impl ScriptedStream {
    pub fn complete(raw: Vec<u8>) -> Self {
        ScriptedStream::Chunks {
            chunks: split_in_two(raw),
            success: true,
        }
    }

    pub fn failed(raw: Vec<u8>) -> Self {
        ScriptedStream::Chunks {
            chunks: split_in_two(raw),
            success: false,
        }
    }

    pub fn hang(raw: Vec<u8>) -> Self {
        ScriptedStream::Hang {
            chunks: split_in_two(raw),
        }
    }
}

/// Deliver the bytes in two chunks so record boundaries fall mid-chunk
fn split_in_two(mut raw: Vec<u8>) -> Vec<Vec<u8>> {
    let tail = raw.split_off(raw.len() / 2);
    vec![raw, tail]
}

/// A `GitRunner` answering from a script.
///
/// Unscripted commands fail the way git does for a bad argument. Streams are
/// played back in order; the last one is reused for later requests.
#[derive(Default)]
pub struct FakeGitRunner {
    responses: HashMap<GitCommand, CommandOutput>,
    delays: HashMap<GitCommand, Duration>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    calls: Mutex<Vec<GitCommand>>,
}

impl FakeGitRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean repository at `/repo` on `master` whose HEAD is `sha(head)`
    pub fn repository(head: u64) -> Self {
        let head = sha(head);

        Self::new()
            .respond(GitCommand::ShowRootPrefix, CommandOutput::success("\n"))
            .respond(GitCommand::CurrentBranch, CommandOutput::success("master\n"))
            .respond(GitCommand::HeadSha, CommandOutput::success(format!("{}\n", head)))
            .respond(
                GitCommand::UntrackedFiles { exclude_from: None },
                CommandOutput::success(""),
            )
            .respond(
                GitCommand::DiffIndex {
                    base: head.clone(),
                    cached: false,
                },
                CommandOutput::success(""),
            )
            .respond(
                GitCommand::DiffIndex {
                    base: head,
                    cached: true,
                },
                CommandOutput::success(""),
            )
    }

    pub fn respond(mut self, command: GitCommand, output: CommandOutput) -> Self {
        self.responses.insert(command, output);
        self
    }

    /// Block the calling thread for `delay` before answering `command`
    pub fn delay(mut self, command: GitCommand, delay: Duration) -> Self {
        self.delays.insert(command, delay);
        self
    }

    pub fn stream_log(self, stream: ScriptedStream) -> Self {
        self.streams.lock().unwrap().push_back(stream);
        self
    }

    /// Every command run or streamed so far, in order
    pub fn calls(&self) -> Vec<GitCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, command: &GitCommand) {
        self.calls.lock().unwrap().push(command.clone());
    }

    fn next_stream(&self) -> Option<ScriptedStream> {
        let mut streams = self.streams.lock().unwrap();
        if streams.len() > 1 {
            streams.pop_front()
        } else {
            streams.front().cloned()
        }
    }
}

impl GitRunner for FakeGitRunner {
    fn run(&self, _workdir: &Path, command: &GitCommand) -> CommandOutput {
        self.record(command);
        if let Some(delay) = self.delays.get(command) {
            std::thread::sleep(*delay);
        }
        self.responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failure(format!("fatal: unscripted {}", command)))
    }

    fn stream(
        &self,
        _workdir: &Path,
        command: &GitCommand,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>> {
        self.record(command);

        let script = self
            .next_stream()
            .ok_or_else(|| LoaderError::Custom(format!("no stream scripted for {}", command)))?;

        let (tx, rx) = mpsc::channel(8);
        match script {
            ScriptedStream::SpawnError => {
                return Err(LoaderError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "git not found",
                )));
            }
            ScriptedStream::Chunks { chunks, success } => {
                tokio::spawn(async move {
                    for chunk in chunks {
                        let _ = tx.send(StreamChunk::Data(chunk)).await;
                    }
                    let _ = tx.send(StreamChunk::Finished { success }).await;
                });
            }
            ScriptedStream::Hang { chunks } => {
                tokio::spawn(async move {
                    for chunk in chunks {
                        let _ = tx.send(StreamChunk::Data(chunk)).await;
                    }
                    cancel.cancelled().await;
                });
            }
        }

        Ok(rx)
    }
}

/// A temporary git repository for testing
pub struct TestRepo {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    /// Create a new empty git repository with `master` as its unborn branch
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();

        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = git2::Repository::init_opts(&path, &opts).expect("Failed to init repo");

        // Configure user for commits
        let mut config = repo.config().expect("Failed to get config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");

        Self { dir, path }
    }

    /// Create a repository with an initial commit
    pub fn with_initial_commit() -> Self {
        let test_repo = Self::new();
        test_repo.create_commit("Initial commit", &[("README.md", "# Test Repo")]);
        test_repo
    }

    pub fn repo(&self) -> git2::Repository {
        git2::Repository::open(&self.path).expect("Failed to open repo")
    }

    pub fn create_file(&self, name: &str, content: &str) {
        let file_path = self.path.join(name);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    pub fn stage_file(&self, name: &str) {
        let repo = self.repo();
        let mut index = repo.index().expect("Failed to get index");
        index.add_path(Path::new(name)).expect("Failed to stage file");
        index.write().expect("Failed to write index");
    }

    /// Create a commit on HEAD with the given files
    pub fn create_commit(&self, message: &str, files: &[(&str, &str)]) -> git2::Oid {
        let repo = self.repo();

        for (name, content) in files {
            self.create_file(name, content);
            self.stage_file(name);
        }

        let mut index = repo.index().expect("Failed to get index");
        let tree_oid = index.write_tree().expect("Failed to write tree");
        let tree = repo.find_tree(tree_oid).expect("Failed to find tree");
        let sig = repo.signature().expect("Failed to get signature");

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.as_ref().into_iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    pub fn head_oid(&self) -> git2::Oid {
        let repo = self.repo();
        let head = repo.head().expect("Failed to get HEAD");
        head.target().expect("Failed to get target")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_log_record_parses() {
        let raw = format_log_record(&sha(2), &[&sha(1)], "Subject", "Body");
        let record = CommitRecord::parse(raw.as_bytes()).unwrap();
        assert_eq!(record.sha, sha(2));
        assert_eq!(record.parents, vec![sha(1)]);
    }

    #[test]
    fn test_fake_runner_fails_unscripted_commands() {
        let runner = FakeGitRunner::new();
        let output = runner.run(Path::new("/repo"), &GitCommand::ShowRefs);
        assert!(!output.success);
        assert_eq!(runner.calls(), vec![GitCommand::ShowRefs]);
    }

    #[test]
    fn test_fake_runner_delays_scripted_command() {
        let runner = FakeGitRunner::new()
            .respond(GitCommand::ShowRefs, CommandOutput::success(""))
            .delay(GitCommand::ShowRefs, Duration::from_millis(20));

        let started = std::time::Instant::now();
        let output = runner.run(Path::new("/repo"), &GitCommand::ShowRefs);
        assert!(output.success);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_create_repo_on_master() {
        let repo = TestRepo::with_initial_commit();
        assert!(repo.path.join(".git").exists());
        let git_repo = repo.repo();
        let head = git_repo.head().expect("No HEAD");
        assert_eq!(head.shorthand(), Some("master"));
    }
}

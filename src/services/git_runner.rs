//! Running git as a subprocess
//!
//! `GitRunner` is the seam between the loader and the git binary: a blocking
//! run-to-completion call for the small queries and a cancelable byte stream
//! for the history walk. `ProcessGitRunner` is the real implementation.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use super::cancellation::CancellationToken;
use crate::error::{LoaderError, Result};
use crate::utils::{create_command, GitCommand};

const STREAM_CHUNK_SIZE: usize = 64 * 1024;
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Outcome of a blocking git invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// stdout on success, stderr otherwise
    pub output: String,
}

impl CommandOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }

    /// Output of a successful run, `None` when git failed
    pub fn into_success(self) -> Option<String> {
        self.success.then_some(self.output)
    }
}

/// One message of a streamed git invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Data(Vec<u8>),
    /// Last message; the channel closes without it when the run is cancelled
    Finished { success: bool },
}

pub trait GitRunner: Send + Sync {
    /// Run to completion and capture the output
    fn run(&self, workdir: &Path, command: &GitCommand) -> CommandOutput;

    /// Start the command and stream its stdout. Cancelling `cancel` kills the
    /// process and closes the channel. Must be called inside a tokio runtime.
    fn stream(
        &self,
        workdir: &Path,
        command: &GitCommand,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>>;
}

/// Runs the git binary found on PATH (or a configured one)
#[derive(Debug, Clone)]
pub struct ProcessGitRunner {
    git_binary: String,
}

impl ProcessGitRunner {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }
}

impl Default for ProcessGitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner for ProcessGitRunner {
    fn run(&self, workdir: &Path, command: &GitCommand) -> CommandOutput {
        let output = create_command(&self.git_binary)
            .current_dir(workdir)
            .args(command.args())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                CommandOutput::success(String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                tracing::debug!("{} failed: {}", command, stderr);
                CommandOutput::failure(stderr)
            }
            Err(e) => {
                tracing::warn!("Failed to run {}: {}", command, e);
                CommandOutput::failure(format!("Failed to run git: {}", e))
            }
        }
    }

    fn stream(
        &self,
        workdir: &Path,
        command: &GitCommand,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<StreamChunk>> {
        let mut cmd = tokio::process::Command::from(create_command(&self.git_binary));
        cmd.current_dir(workdir)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LoaderError::OperationFailed("git stdout unavailable".into()))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let label = command.to_string();

        tokio::spawn(async move {
            // stderr drains alongside stdout so a chatty git cannot block on a full pipe
            let stderr_task = stderr.map(|mut stderr| {
                tokio::spawn(async move {
                    let mut text = String::new();
                    let _ = stderr.read_to_string(&mut text).await;
                    text
                })
            });
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("Cancelling {}", label);
                        if let Err(e) = child.kill().await {
                            tracing::warn!("Failed to kill {}: {}", label, e);
                        }
                        return;
                    }
                    read = stdout.read(&mut buf) => match read {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(StreamChunk::Data(buf[..n].to_vec())).await.is_err() {
                                // Receiver went away, nobody wants the rest
                                let _ = child.kill().await;
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed reading output of {}: {}", label, e);
                            break;
                        }
                    }
                }
            }

            let error_text = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };

            let success = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    return;
                }
                status = child.wait() => status.map(|s| s.success()).unwrap_or(false),
            };

            if !success {
                tracing::warn!("{} failed: {}", label, error_text.trim());
            }

            let _ = tx.send(StreamChunk::Finished { success }).await;
        });

        Ok(rx)
    }
}

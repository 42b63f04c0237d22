//! Repository loading
//!
//! `RepositoryLoader` drives one load at a time: resolve the root, refresh the
//! current branch, install the pending-changes entry, stream the history,
//! parse it into the index, then load references and branch distances.
//! Progress is reported on an event channel handed out by `new`; the final
//! result of a load comes from its `LoadHandle`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::utils::{GitCommand, LogScope};

use super::cancellation::CancellationToken;
use super::divergence::BranchDivergenceProbe;
use super::git_runner::{GitRunner, StreamChunk};
use super::git_service::GitService;
use super::log_parser::{split_records, LogStreamParser};
use super::refs::{scan_references, ReferenceScan};
use super::repo_index::{create_shared_index, RepositoryIndex, SharedRepositoryIndex};
use super::working_copy::WorkingCopyStateBuilder;

/// Progress of a load, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LoadEvent {
    /// The history stream is complete and holds `total` candidate records
    Started { total: usize },
    /// `processed` commits are in the index
    Step { processed: usize },
    Finished,
    ConfigurationError { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadState {
    Idle,
    Loading,
}

/// Owner of the Loading state; the generation tells a finishing load
/// whether it still owns it
enum LoadSlot {
    Idle,
    Loading {
        generation: u64,
        cancel: CancellationToken,
    },
}

/// How a dispatched load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Completed { commits: usize },
    Cancelled,
    Failed(String),
}

impl LoadOutcome {
    /// Number of commits loaded
    pub fn into_result(self) -> Result<usize> {
        match self {
            LoadOutcome::Completed { commits } => Ok(commits),
            LoadOutcome::Cancelled => Err(LoaderError::Cancelled),
            LoadOutcome::Failed(reason) => Err(LoaderError::OperationFailed(reason)),
        }
    }
}

/// A load whose log request has been dispatched
#[derive(Debug)]
pub struct LoadHandle {
    task: JoinHandle<LoadOutcome>,
}

impl LoadHandle {
    pub async fn wait(self) -> LoadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Load task failed: {}", e);
                LoadOutcome::Failed(format!("Load task failed: {}", e))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// How the history stream ended
enum StreamEnd {
    Complete(Vec<u8>),
    Failed,
    Cancelled,
}

struct LoaderShared {
    git: GitService,
    runner: Arc<dyn GitRunner>,
    config: LoaderConfig,
    index: SharedRepositoryIndex,
    slot: Mutex<LoadSlot>,
    next_generation: AtomicU64,
    events: mpsc::UnboundedSender<LoadEvent>,
}

/// Loads a repository into a shared index, one load at a time
#[derive(Clone)]
pub struct RepositoryLoader {
    inner: Arc<LoaderShared>,
}

impl RepositoryLoader {
    pub fn new(
        runner: Arc<dyn GitRunner>,
        config: LoaderConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let git = GitService::new(Arc::clone(&runner));
        if let Some(dir) = &config.working_dir {
            if let Err(e) = git.set_working_dir(dir) {
                tracing::warn!("Ignoring working directory {}: {}", dir.display(), e);
            }
        }

        let loader = Self {
            inner: Arc::new(LoaderShared {
                git,
                runner,
                config,
                index: create_shared_index(),
                slot: Mutex::new(LoadSlot::Idle),
                next_generation: AtomicU64::new(1),
                events,
            }),
        };

        (loader, receiver)
    }

    pub fn index(&self) -> SharedRepositoryIndex {
        Arc::clone(&self.inner.index)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    pub fn set_working_dir(&self, path: &Path) -> Result<()> {
        self.inner.git.set_working_dir(path)
    }

    /// The resolved repository root once a load got past root resolution
    pub fn working_dir(&self) -> Result<Option<PathBuf>> {
        self.inner.git.working_dir()
    }

    pub fn current_branch(&self) -> Result<Option<String>> {
        self.inner.git.current_branch()
    }

    pub fn state(&self) -> Result<LoadState> {
        Ok(match *self.inner.lock_slot()? {
            LoadSlot::Idle => LoadState::Idle,
            LoadSlot::Loading { .. } => LoadState::Loading,
        })
    }

    /// Cancel the load in progress, if any. Returns whether one was running.
    ///
    /// The state is Idle when this returns, so a new load can start right
    /// away. The cancelled load clears whatever it had put in the index,
    /// unless a newer load has begun by then.
    pub fn cancel(&self) -> Result<bool> {
        let mut slot = self.inner.lock_slot()?;

        match std::mem::replace(&mut *slot, LoadSlot::Idle) {
            LoadSlot::Loading { generation, cancel } => {
                cancel.cancel();
                drop(slot);

                tracing::info!("Cancelled load {}", generation);
                self.inner.emit(LoadEvent::Cancelled);
                Ok(true)
            }
            LoadSlot::Idle => Ok(false),
        }
    }

    /// Start loading the repository.
    ///
    /// Fails without touching the index when a load is already running or
    /// no working directory is set. Returns once the log request has been
    /// dispatched; the handle resolves when the load is over.
    pub async fn start_load(&self, show_all: bool) -> Result<LoadHandle> {
        let (generation, cancel) = self.inner.begin()?;
        tracing::info!("Starting load {} (all refs: {})", generation, show_all);

        match self.dispatch(show_all, &cancel).await {
            Ok((root, label, chunks)) => {
                let inner = Arc::clone(&self.inner);
                let task = tokio::spawn(async move {
                    inner.complete(generation, cancel, root, label, chunks).await
                });
                Ok(LoadHandle { task })
            }
            Err(e) => {
                self.inner.abort(generation, &cancel, &e).await;
                Err(e)
            }
        }
    }

    /// Everything up to and including dispatching the log request
    async fn dispatch(
        &self,
        show_all: bool,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, String, mpsc::Receiver<StreamChunk>)> {
        self.inner.index.write().await.clear();

        let inner = Arc::clone(&self.inner);
        let (root, branch, working_copy) = tokio::task::spawn_blocking(move || {
            let root = inner.git.resolve_repo_root()?;
            let branch = inner.git.update_current_branch()?;
            let working_copy = WorkingCopyStateBuilder::new(inner.runner.as_ref(), &root)
                .honor_info_exclude(inner.config.honor_info_exclude)
                .build();
            Ok::<_, LoaderError>((root, branch, working_copy))
        })
        .await
        .map_err(|e| LoaderError::OperationFailed(format!("Load task failed: {}", e)))??;

        {
            let mut index = self.inner.index.write().await;
            if cancel.is_cancelled() {
                return Err(LoaderError::Cancelled);
            }
            working_copy.apply(&mut index);
        }

        let scope = match branch {
            _ if show_all => LogScope::All,
            Some(branch) => LogScope::Branch(branch),
            None => LogScope::Branch("HEAD".to_string()),
        };
        let command = GitCommand::Log { scope };
        tracing::debug!("Requesting {}", command);

        let chunks = self.inner.runner.stream(&root, &command, cancel.clone())?;
        Ok((root, command.to_string(), chunks))
    }
}

impl LoaderShared {
    fn lock_slot(&self) -> Result<MutexGuard<'_, LoadSlot>> {
        self.slot
            .lock()
            .map_err(|_| LoaderError::OperationFailed("Lock poisoned".to_string()))
    }

    fn emit(&self, event: LoadEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Idle -> Loading, or the reason a load cannot start
    fn begin(&self) -> Result<(u64, CancellationToken)> {
        let mut slot = self.lock_slot()?;

        if matches!(*slot, LoadSlot::Loading { .. }) {
            tracing::warn!("Rejecting load request, a load is already in progress");
            return Err(LoaderError::LoadInProgress);
        }

        if self.git.working_dir()?.is_none() {
            let err = LoaderError::NoWorkingDirectory;
            tracing::error!("Cannot load: {}", err);
            self.emit(LoadEvent::ConfigurationError {
                reason: err.to_string(),
            });
            return Err(err);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        *slot = LoadSlot::Loading {
            generation,
            cancel: cancel.clone(),
        };

        Ok((generation, cancel))
    }

    /// Loading -> Idle for the load that still owns the slot
    fn release(&self, generation: u64) -> bool {
        let Ok(mut slot) = self.lock_slot() else {
            return false;
        };

        match &*slot {
            LoadSlot::Loading {
                generation: current,
                ..
            } if *current == generation => {
                *slot = LoadSlot::Idle;
                true
            }
            _ => false,
        }
    }

    /// Clear what a cancelled load left in the index, unless a newer load
    /// has begun and owns it now. Call with the index write lock held.
    fn discard(&self, index: &mut RepositoryIndex, generation: u64) {
        if self.next_generation.load(Ordering::SeqCst) == generation + 1 {
            index.clear();
            tracing::debug!("Discarded the snapshot of cancelled load {}", generation);
        }
    }

    async fn discard_cancelled(&self, generation: u64) -> LoadOutcome {
        let mut index = self.index.write().await;
        self.discard(&mut index, generation);
        LoadOutcome::Cancelled
    }

    /// Abort a load on a load-critical failure
    async fn abort(&self, generation: u64, cancel: &CancellationToken, err: &LoaderError) {
        let released = {
            let mut index = self.index.write().await;
            if cancel.is_cancelled() {
                self.discard(&mut index, generation);
                return;
            }
            index.clear();
            self.release(generation)
        };

        if released {
            tracing::error!("Load {} failed: {}", generation, err);
            self.emit(LoadEvent::ConfigurationError {
                reason: err.to_string(),
            });
        }
    }

    /// The part of a load that runs after the log request is dispatched
    async fn complete(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        root: PathBuf,
        label: String,
        mut chunks: mpsc::Receiver<StreamChunk>,
    ) -> LoadOutcome {
        let raw = match collect_stream(&mut chunks, &cancel).await {
            StreamEnd::Complete(raw) => raw,
            StreamEnd::Cancelled => return self.discard_cancelled(generation).await,
            StreamEnd::Failed => {
                let err = LoaderError::CommandFailed {
                    command: label,
                    stderr: "the history stream did not complete".to_string(),
                };
                let reason = err.to_string();
                self.abort(generation, &cancel, &err).await;
                return if cancel.is_cancelled() {
                    LoadOutcome::Cancelled
                } else {
                    LoadOutcome::Failed(reason)
                };
            }
        };

        let total = split_records(&raw).len();
        let commits = {
            let mut index = self.index.write().await;
            if cancel.is_cancelled() {
                self.discard(&mut index, generation);
                return LoadOutcome::Cancelled;
            }

            index.configure(total);
            self.emit(LoadEvent::Started { total });

            let events = &self.events;
            LogStreamParser::new(|processed| {
                let _ = events.send(LoadEvent::Step { processed });
            })
            .parse_into(&raw, &mut index)
        };
        tracing::debug!("Parsed {} of {} records", commits, total);

        if cancel.is_cancelled() {
            return self.discard_cancelled(generation).await;
        }

        let shared = Arc::clone(&self);
        let scan = tokio::task::spawn_blocking(move || {
            let runner = shared.runner.as_ref();
            let probe = BranchDivergenceProbe::new(
                runner,
                &root,
                shared.config.default_branch.clone(),
                shared.config.remote_baseline(),
            );
            scan_references(runner, &root, &probe)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Reference loading failed: {}", e);
            ReferenceScan::default()
        });

        let released = {
            let mut index = self.index.write().await;
            if cancel.is_cancelled() {
                self.discard(&mut index, generation);
                return LoadOutcome::Cancelled;
            }
            scan.apply(&mut index);
            let released = self.release(generation);
            if !released {
                self.discard(&mut index, generation);
            }
            released
        };

        if !released {
            return LoadOutcome::Cancelled;
        }

        tracing::info!("Load {} finished with {} commits", generation, commits);
        self.emit(LoadEvent::Finished);
        LoadOutcome::Completed { commits }
    }
}

async fn collect_stream(
    chunks: &mut mpsc::Receiver<StreamChunk>,
    cancel: &CancellationToken,
) -> StreamEnd {
    let mut raw = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            chunk = chunks.recv() => match chunk {
                Some(StreamChunk::Data(bytes)) => raw.extend_from_slice(&bytes),
                Some(StreamChunk::Finished { success: true }) => return StreamEnd::Complete(raw),
                Some(StreamChunk::Finished { success: false }) => return StreamEnd::Failed,
                None if cancel.is_cancelled() => return StreamEnd::Cancelled,
                None => return StreamEnd::Failed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::ZERO_SHA;
    use crate::services::git_runner::CommandOutput;
    use crate::test_utils::{format_log_record, sha, FakeGitRunner, ScriptedStream};

    fn history(n: u64) -> Vec<u8> {
        let records: Vec<String> = (1..=n)
            .rev()
            .map(|i| {
                let parent = sha(i - 1);
                let parents: Vec<&str> = if i > 1 { vec![parent.as_str()] } else { vec![] };
                format_log_record(&sha(i), &parents, &format!("Commit {}", i), "")
            })
            .collect();
        records.join("\0").into_bytes()
    }

    fn loader(runner: FakeGitRunner) -> (RepositoryLoader, mpsc::UnboundedReceiver<LoadEvent>) {
        RepositoryLoader::new(
            Arc::new(runner),
            LoaderConfig::default().with_working_dir("/repo"),
        )
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<LoadEvent>) -> Vec<LoadEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    #[tokio::test]
    async fn test_load_assigns_sequences_and_reports_progress() {
        let runner = FakeGitRunner::repository(3).stream_log(ScriptedStream::complete(history(3)));
        let (loader, mut events) = loader(runner);

        let handle = loader.start_load(true).await.unwrap();
        assert_eq!(handle.wait().await, LoadOutcome::Completed { commits: 3 });
        assert_eq!(loader.state().unwrap(), LoadState::Idle);

        let index = loader.index();
        let index = index.read().await;
        let sequences: Vec<usize> = index.commits().iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(index.commits()[0].sha, sha(3));
        assert!(index.pending_changes().is_none());

        assert_eq!(
            drain(&mut events),
            vec![
                LoadEvent::Started { total: 3 },
                LoadEvent::Step { processed: 1 },
                LoadEvent::Step { processed: 2 },
                LoadEvent::Step { processed: 3 },
                LoadEvent::Finished,
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_record_truncates_but_finishes() {
        let mut raw = history(2);
        raw.extend_from_slice(b"\0not a record");
        let runner = FakeGitRunner::repository(2).stream_log(ScriptedStream::complete(raw));
        let (loader, mut events) = loader(runner);

        let outcome = loader.start_load(true).await.unwrap().wait().await;
        assert_eq!(outcome, LoadOutcome::Completed { commits: 2 });
        assert_eq!(loader.index().read().await.commits().len(), 2);

        let events = drain(&mut events);
        assert_eq!(events.first(), Some(&LoadEvent::Started { total: 3 }));
        assert_eq!(events.last(), Some(&LoadEvent::Finished));
    }

    #[tokio::test]
    async fn test_load_scopes_log_to_current_branch() {
        let runner = Arc::new(
            FakeGitRunner::repository(1)
                .respond(GitCommand::CurrentBranch, CommandOutput::success("feature\n"))
                .stream_log(ScriptedStream::complete(history(1))),
        );
        let (loader, _events) = RepositoryLoader::new(
            runner.clone(),
            LoaderConfig::default().with_working_dir("/repo"),
        );

        loader.start_load(false).await.unwrap().wait().await;

        assert!(runner.calls().contains(&GitCommand::Log {
            scope: LogScope::Branch("feature".into())
        }));
        assert_eq!(loader.current_branch().unwrap().as_deref(), Some("feature"));
    }

    #[tokio::test]
    async fn test_references_and_distances_are_loaded() {
        let show_ref = format!(
            "{} refs/heads/master\n{} refs/heads/feature\n{} refs/tags/v1.0\n",
            sha(2),
            sha(1),
            sha(1)
        );
        let runner = FakeGitRunner::repository(2)
            .respond(GitCommand::ShowRefs, CommandOutput::success(show_ref))
            .respond(
                GitCommand::AheadBehind {
                    baseline: "master".into(),
                    branch: "feature".into(),
                },
                CommandOutput::success("1\t0\n"),
            )
            .stream_log(ScriptedStream::complete(history(2)));
        let (loader, _events) = loader(runner);

        loader.start_load(true).await.unwrap().wait().await;

        let index = loader.index();
        let index = index.read().await;
        assert_eq!(index.commit_for_branch("feature", true), Some(sha(1).as_str()));
        assert_eq!(index.tags(), vec![(sha(1), vec!["v1.0".to_string()])]);
        assert_eq!(index.branch_distances("feature").behind_master, 1);
        assert_eq!(index.branch_distances("feature").behind_origin, 0);
    }

    #[tokio::test]
    async fn test_reentrant_start_is_rejected() {
        let untracked = GitCommand::UntrackedFiles { exclude_from: None };
        let runner = FakeGitRunner::repository(1)
            .respond(untracked, CommandOutput::success("new.txt\n"))
            .stream_log(ScriptedStream::hang(history(1)));
        let (loader, _events) = loader(runner);

        let _handle = loader.start_load(true).await.unwrap();
        assert_eq!(loader.state().unwrap(), LoadState::Loading);

        let err = loader.start_load(true).await.unwrap_err();
        assert!(matches!(err, LoaderError::LoadInProgress));
        assert_eq!(loader.state().unwrap(), LoadState::Loading);
        assert!(loader.index().read().await.pending_changes().is_some());

        loader.cancel().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_then_fresh_reload() {
        let runner = FakeGitRunner::repository(5)
            .stream_log(ScriptedStream::hang(history(5)))
            .stream_log(ScriptedStream::complete(history(2)));
        let (loader, mut events) = loader(runner);

        let first = loader.start_load(true).await.unwrap();
        assert!(loader.cancel().unwrap());
        assert_eq!(loader.state().unwrap(), LoadState::Idle);
        assert_eq!(first.wait().await, LoadOutcome::Cancelled);
        assert!(drain(&mut events).contains(&LoadEvent::Cancelled));
        assert!(loader.index().read().await.is_empty());

        let second = loader.start_load(true).await.unwrap();
        assert_eq!(second.wait().await, LoadOutcome::Completed { commits: 2 });

        let index = loader.index();
        let index = index.read().await;
        assert_eq!(index.commits().len(), 2);
        assert!(index.commit(&sha(5)).is_none());
        assert!(!loader.cancel().unwrap());
    }

    #[tokio::test]
    async fn test_cancel_during_reference_scan_discards_snapshot() {
        let show_ref = format!("{} refs/heads/master\n", sha(2));
        let runner = FakeGitRunner::repository(2)
            .respond(
                GitCommand::UntrackedFiles { exclude_from: None },
                CommandOutput::success("notes.txt\n"),
            )
            .respond(GitCommand::ShowRefs, CommandOutput::success(show_ref))
            .delay(GitCommand::ShowRefs, Duration::from_millis(300))
            .stream_log(ScriptedStream::complete(history(2)));
        let (loader, mut events) = loader(runner);

        let handle = loader.start_load(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(loader.cancel().unwrap());

        assert_eq!(handle.wait().await, LoadOutcome::Cancelled);
        assert_eq!(loader.state().unwrap(), LoadState::Idle);

        let index = loader.index();
        let index = index.read().await;
        assert!(index.is_empty());
        assert!(index.untracked_files().is_empty());
        assert_eq!(index.commit_for_branch("master", true), None);

        let events = drain(&mut events);
        assert!(events.contains(&LoadEvent::Started { total: 2 }));
        assert!(events.contains(&LoadEvent::Cancelled));
        assert!(!events.contains(&LoadEvent::Finished));
    }

    #[tokio::test]
    async fn test_cancelled_load_keeps_newer_snapshot() {
        let runner = FakeGitRunner::repository(2)
            .delay(GitCommand::ShowRefs, Duration::from_millis(200))
            .stream_log(ScriptedStream::complete(history(2)));
        let (loader, _events) = loader(runner);

        let first = loader.start_load(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(loader.cancel().unwrap());

        let second = loader.start_load(true).await.unwrap();
        assert_eq!(first.wait().await, LoadOutcome::Cancelled);
        assert_eq!(second.wait().await, LoadOutcome::Completed { commits: 2 });
        assert_eq!(loader.index().read().await.commits().len(), 2);
    }

    #[tokio::test]
    async fn test_untracked_file_adds_pending_entry() {
        let runner = FakeGitRunner::repository(2)
            .respond(
                GitCommand::UntrackedFiles { exclude_from: None },
                CommandOutput::success("notes.txt\n"),
            )
            .stream_log(ScriptedStream::complete(history(2)));
        let (loader, _events) = loader(runner);

        loader.start_load(true).await.unwrap().wait().await;

        let index = loader.index();
        let index = index.read().await;
        let pending = index.commit_at(0).unwrap();
        assert_eq!(pending.sha, ZERO_SHA);
        assert_eq!(pending.sequence, 0);
        assert_eq!(pending.parents, vec![sha(2)]);
        assert_eq!(index.commit_at(1).unwrap().sequence, 1);
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_working_dir() {
        let (loader, mut events) =
            RepositoryLoader::new(Arc::new(FakeGitRunner::repository(1)), LoaderConfig::default());

        let err = loader.start_load(true).await.unwrap_err();
        assert!(matches!(err, LoaderError::NoWorkingDirectory));
        assert_eq!(loader.state().unwrap(), LoadState::Idle);
        assert!(matches!(
            drain(&mut events).as_slice(),
            [LoadEvent::ConfigurationError { .. }]
        ));
    }

    #[tokio::test]
    async fn test_not_a_repository_returns_to_idle() {
        let runner = FakeGitRunner::repository(1).respond(
            GitCommand::ShowRootPrefix,
            CommandOutput::failure("fatal: not a git repository"),
        );
        let (loader, mut events) = loader(runner);

        let err = loader.start_load(true).await.unwrap_err();
        assert!(matches!(err, LoaderError::NotARepository(_)));
        assert!(err.is_configuration_error());
        assert_eq!(loader.state().unwrap(), LoadState::Idle);
        assert!(matches!(
            drain(&mut events).as_slice(),
            [LoadEvent::ConfigurationError { .. }]
        ));
    }

    #[tokio::test]
    async fn test_failed_log_clears_the_index() {
        let runner = FakeGitRunner::repository(1)
            .respond(
                GitCommand::UntrackedFiles { exclude_from: None },
                CommandOutput::success("new.txt\n"),
            )
            .stream_log(ScriptedStream::failed(history(1)));
        let (loader, mut events) = loader(runner);

        let outcome = loader.start_load(true).await.unwrap().wait().await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(outcome.into_result().is_err());
        assert_eq!(loader.state().unwrap(), LoadState::Idle);
        assert!(loader.index().read().await.is_empty());

        let events = drain(&mut events);
        assert!(matches!(
            events.last(),
            Some(LoadEvent::ConfigurationError { .. })
        ));
        assert!(!events.contains(&LoadEvent::Finished));
    }

    #[tokio::test]
    async fn test_log_spawn_error_returns_to_idle() {
        let runner = FakeGitRunner::repository(1).stream_log(ScriptedStream::SpawnError);
        let (loader, _events) = loader(runner);

        assert!(loader.start_load(true).await.is_err());
        assert_eq!(loader.state().unwrap(), LoadState::Idle);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&LoadEvent::Started { total: 4 }).unwrap();
        assert_eq!(json, r#"{"kind":"started","total":4}"#);
        assert_eq!(
            serde_json::to_string(&LoadEvent::Finished).unwrap(),
            r#"{"kind":"finished"}"#
        );
    }
}

//! Service layer for the repository loader
//!
//! The loader orchestrates the other services: it runs git through a
//! `GitRunner`, parses what comes back and fills the `RepositoryIndex`.

pub mod cancellation;
pub mod divergence;
pub mod git_runner;
pub mod git_service;
pub mod log_parser;
pub mod refs;
pub mod repo_index;
pub mod repo_loader;
pub mod working_copy;

pub use cancellation::CancellationToken;
pub use divergence::BranchDivergenceProbe;
pub use git_runner::{CommandOutput, GitRunner, ProcessGitRunner, StreamChunk};
pub use git_service::GitService;
pub use log_parser::LogStreamParser;
pub use refs::{classify_reference, scan_references, ReferenceScan};
pub use repo_index::{create_shared_index, IndexSummary, RepositoryIndex, SharedRepositoryIndex};
pub use repo_loader::{LoadEvent, LoadHandle, LoadOutcome, LoadState, RepositoryLoader};
pub use working_copy::{WorkingCopyState, WorkingCopyStateBuilder};

//! Revloader - repository history loader
//!
//! Drives the `git` binary to load a repository's commit history, its
//! branches and tags, per-branch distances to the default branch and the
//! uncommitted working-copy state into an in-memory index.
//!
//! ```no_run
//! use std::sync::Arc;
//! use revloader::{LoaderConfig, ProcessGitRunner, RepositoryLoader};
//!
//! # async fn example() -> revloader::Result<()> {
//! let config = LoaderConfig::load_default()?.with_working_dir("/path/to/repo");
//! let runner = Arc::new(ProcessGitRunner::new(config.git_binary.clone()));
//! let (loader, mut events) = RepositoryLoader::new(runner, config);
//!
//! let handle = loader.start_load(true).await?;
//! while let Ok(event) = events.try_recv() {
//!     println!("{:?}", event);
//! }
//! let commits = handle.wait().await.into_result()?;
//! println!("loaded {} commits", commits);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::LoaderConfig;
pub use error::{LoaderError, Result};
pub use services::{
    GitRunner, LoadEvent, LoadHandle, LoadOutcome, LoadState, ProcessGitRunner, RepositoryIndex,
    RepositoryLoader, SharedRepositoryIndex,
};

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to `revloader=debug`. Does nothing if a
/// subscriber is already installed.
pub fn init_tracing() {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revloader=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if installed.is_ok() {
        tracing::info!("Starting revloader");
    }
}

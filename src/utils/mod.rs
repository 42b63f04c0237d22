//! Shared helpers

pub mod command;

pub use command::{create_command, GitCommand, LogScope};

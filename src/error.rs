//! Error types for the repository loader

use serde::Serialize;
use thiserror::Error;

/// Loader error types
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No working directory set")]
    NoWorkingDirectory,

    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("A repository load is already in progress")]
    LoadInProgress,

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Load cancelled")]
    Cancelled,

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("{0}")]
    Custom(String),
}

impl LoaderError {
    /// Stable machine-readable code for the error
    pub fn code(&self) -> &'static str {
        match self {
            LoaderError::Io(_) => "IO_ERROR",
            LoaderError::Serialization(_) => "SERIALIZATION_ERROR",
            LoaderError::NoWorkingDirectory => "NO_WORKING_DIRECTORY",
            LoaderError::NotARepository(_) => "NOT_A_REPOSITORY",
            LoaderError::LoadInProgress => "LOAD_IN_PROGRESS",
            LoaderError::CommandFailed { .. } => "COMMAND_FAILED",
            LoaderError::Cancelled => "CANCELLED",
            LoaderError::OperationFailed(_) => "OPERATION_FAILED",
            LoaderError::Custom(_) => "CUSTOM_ERROR",
        }
    }

    /// Whether the error comes from repository configuration rather than from git itself
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LoaderError::NoWorkingDirectory | LoaderError::NotARepository(_)
        )
    }
}

/// Serializable error response for IPC
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<LoaderError> for ErrorResponse {
    fn from(error: LoaderError) -> Self {
        let details = match &error {
            LoaderError::CommandFailed { command, .. } => Some(command.clone()),
            _ => None,
        };

        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

impl serde::Serialize for LoaderError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details: None,
        };
        response.serialize(serializer)
    }
}

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

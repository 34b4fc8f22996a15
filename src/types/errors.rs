use thiserror::Error;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{cause}")]
    ToolFailed { tool: String, cause: anyhow::Error },

    #[error("Resource '{uri}' failed: {cause}")]
    ResourceFailed { uri: String, cause: anyhow::Error },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid schema for '{tool}': {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("Failed to load config from {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error("Unsupported server transport: {0}")]
    UnsupportedTransport(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

//! Typed views over the configuration sections

use crate::config::defaults::{DEFAULT_LOG_LEVEL, DEFAULT_SERVER_NAME, DEFAULT_TOOL_TIMEOUT_SECS};
use crate::types::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub name: String,
    pub log_level: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Transports the server knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            kind: "stdio".to_string(),
        }
    }
}

impl ServerSettings {
    pub fn transport(&self) -> Result<Transport> {
        match self.kind.to_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            other => Err(RuntimeError::UnsupportedTransport(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// When unset, `MCP_RUNTIME_LOG_LEVEL` and then `info` apply.
    pub level: Option<String>,
    pub format: LogFormat,
    pub quiet_libraries: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Full,
            quiet_libraries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Register the built-in `echo`/`ticker` tools and `config://runtime`.
    pub builtin: bool,
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            builtin: true,
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

impl ToolSettings {
    /// Per-call limit for `tools/call`. `timeout_secs: 0` means no limit.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

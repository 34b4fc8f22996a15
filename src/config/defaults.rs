//! Built-in default configuration
//!
//! These give a working stdio server without any config file.

use serde_json::{json, Map, Value};

pub const DEFAULT_SERVER_NAME: &str = "generic-mcp-server";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

pub fn default_document() -> Map<String, Value> {
    let document = json!({
        "host": {
            "name": DEFAULT_SERVER_NAME,
            "log_level": DEFAULT_LOG_LEVEL,
        },
        "server": {
            "type": "stdio",
        },
        "logging": {
            "level": DEFAULT_LOG_LEVEL,
            "format": "full",
            "quiet_libraries": true,
        },
        "tools": {
            "builtin": true,
            "timeout_secs": DEFAULT_TOOL_TIMEOUT_SECS,
        },
    });

    match document {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

//! Configuration loading
//!
//! Search order when no explicit paths are given:
//! 1. ./config.yaml, ./config.yml
//! 2. $MCP_RUNTIME_CONFIG_PATH
//! 3. <project root>/config.yaml
//! 4. ~/.config/mcp-runtime/config.yaml
//!
//! The first file that exists and parses wins; it is merged over the
//! built-in defaults.

use crate::config::RuntimeConfig;
use crate::types::{Result, RuntimeError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONFIG_PATH_ENV: &str = "MCP_RUNTIME_CONFIG_PATH";

const PROJECT_MARKERS: &[&str] = &["config.yaml", "config.yml", "Cargo.toml"];
const MAX_ROOT_SEARCH_DEPTH: usize = 10;

/// Load configuration from the first usable file in `paths`, or from the
/// default search path when `paths` is `None`.
///
/// Never fails: unreadable or malformed files are logged and skipped, and
/// the built-in defaults are returned when nothing usable is found.
pub fn load_config(paths: Option<&[PathBuf]>) -> RuntimeConfig {
    let candidates = match paths {
        Some(paths) => paths.to_vec(),
        None => default_candidates(),
    };

    let mut config = RuntimeConfig::default();

    for path in candidates.iter().filter(|p| !p.as_os_str().is_empty()) {
        if !path.exists() {
            continue;
        }

        match read_config_file(path) {
            Ok(overrides) => {
                info!("Loaded configuration from {}", path.display());
                config.merge(overrides);
                config.set_source(path);
                return config;
            }
            Err(e) => {
                warn!("{}", e);
            }
        }
    }

    debug!("No config file found, using built-in defaults");
    config
}

/// Parse a single config file into a top-level mapping.
///
/// `.toml` files are read as TOML, everything else as YAML. An empty
/// document yields an empty mapping.
pub fn read_config_file(path: &Path) -> Result<Map<String, Value>> {
    let fail = |reason: String| RuntimeError::ConfigFile {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    let is_toml = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));

    let value: Value = if is_toml {
        toml::from_str(&content).map_err(|e| fail(e.to_string()))?
    } else {
        serde_yaml::from_str(&content).map_err(|e| fail(e.to_string()))?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(fail("top level must be a mapping".to_string())),
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("config.yaml"));
        candidates.push(cwd.join("config.yml"));
    }

    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        candidates.push(PathBuf::from(config_path));
    }

    candidates.push(find_project_root(None).join("config.yaml"));

    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("mcp-runtime").join("config.yaml"));
    }

    candidates
}

/// Walk up from `start` (default: the current directory) looking for a
/// directory holding a project marker. Falls back to `start`.
pub fn find_project_root(start: Option<&Path>) -> PathBuf {
    let start = start
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let start = start.canonicalize().unwrap_or(start);

    let mut dir = start.as_path();
    for _ in 0..MAX_ROOT_SEARCH_DEPTH {
        if PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()) {
            debug!("Detected project root: {}", dir.display());
            return dir.to_path_buf();
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => break,
        }
    }

    warn!(
        "No project root markers found, using {} as project root",
        start.display()
    );
    start
}

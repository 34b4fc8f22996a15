//! The merged configuration document

use crate::config::defaults::default_document;
use crate::config::settings::{HostSettings, LoggingSettings, ServerSettings, ToolSettings};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    document: Map<String, Value>,
    source: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_document(default_document())
    }
}

impl RuntimeConfig {
    pub fn from_document(document: Map<String, Value>) -> Self {
        Self {
            document,
            source: None,
        }
    }

    /// Shallow merge: each top-level key of `overrides` replaces ours.
    pub fn merge(&mut self, overrides: Map<String, Value>) {
        self.document.extend(overrides);
    }

    pub(crate) fn set_source(&mut self, path: &Path) {
        self.source = Some(path.to_path_buf());
    }

    /// The file this configuration was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Look up a value by dot-separated path, e.g. `"host.name"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut keys = path.split('.');
        let mut current = self.document.get(keys.next()?)?;
        for key in keys {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Typed lookup that falls back to `default` when the path is missing
    /// or holds a value of another shape.
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }

    /// Set a value by dot-separated path, creating intermediate objects.
    pub fn set(&mut self, path: &str, value: Value) {
        let keys: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = keys.split_last() else {
            return;
        };

        let mut current = &mut self.document;
        for key in parents {
            let entry = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.to_string(), value);
    }

    pub fn host(&self) -> HostSettings {
        self.section("host")
    }

    pub fn server(&self) -> ServerSettings {
        self.section("server")
    }

    pub fn logging(&self) -> LoggingSettings {
        self.section("logging")
    }

    pub fn tools(&self) -> ToolSettings {
        self.section("tools")
    }

    fn section<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.document.get(key) {
            None | Some(Value::Null) => T::default(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Invalid '{}' section in config, using defaults: {}", key, e);
                T::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use serde_json::json;

    fn config_from(value: Value) -> RuntimeConfig {
        match value {
            Value::Object(map) => RuntimeConfig::from_document(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_get_dotted_path() {
        let config = config_from(json!({ "a": { "b": { "c": 123 } } }));
        assert_eq!(config.get("a.b.c"), Some(&json!(123)));
        assert_eq!(config.get("a.x.c"), None);
        assert_eq!(config.get_or("a.x.c", "not found".to_string()), "not found");
        assert_eq!(config.get_or("a.b.c", 0u32), 123);
    }

    #[test]
    fn test_get_through_non_object() {
        let config = config_from(json!({ "a": 5 }));
        assert_eq!(config.get("a.b"), None);
    }

    #[test]
    fn test_shallow_merge_replaces_sections() {
        let mut config = RuntimeConfig::default();
        let overrides = config_from(json!({ "host": { "name": "test-server" } }));
        config.merge(overrides.document().clone());

        assert_eq!(config.get("host.name"), Some(&json!("test-server")));
        assert_eq!(config.get("host.log_level"), None);
        assert_eq!(config.host().log_level, "INFO");
        assert_eq!(config.get("server.type"), Some(&json!("stdio")));
    }

    #[test]
    fn test_set_creates_parents() {
        let mut config = config_from(json!({ "logging": "oops" }));
        config.set("logging.level", json!("DEBUG"));
        assert_eq!(config.logging().level.as_deref(), Some("DEBUG"));

        config.set("new.deep.key", json!(true));
        assert_eq!(config.get("new.deep.key"), Some(&json!(true)));
    }

    #[test]
    fn test_invalid_section_falls_back() {
        let config = config_from(json!({ "logging": { "format": "xml" } }));
        assert_eq!(config.logging().format, LogFormat::Full);
    }

    #[test]
    fn test_typed_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.host().name, "generic-mcp-server");
        assert_eq!(config.logging().level.as_deref(), Some("INFO"));
        assert!(config.tools().builtin);
        assert!(config.source().is_none());
    }
}

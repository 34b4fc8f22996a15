//! Configuration system for the MCP runtime
//!
//! A configuration is a JSON-like document built from two layers:
//! 1. The first config file found on the search path (highest priority)
//! 2. Built-in defaults (lowest priority)
//!
//! Layers are merged shallowly: a top-level key in the file replaces the
//! whole default section of the same name. Typed views over each section
//! fill in any missing fields from their own defaults.

mod defaults;
mod loader;
mod runtime_config;
mod settings;

pub use defaults::default_document;
pub use loader::{find_project_root, load_config, read_config_file, CONFIG_PATH_ENV};
pub use runtime_config::RuntimeConfig;
pub use settings::{
    HostSettings, LogFormat, LoggingSettings, ServerSettings, ToolSettings, Transport,
};

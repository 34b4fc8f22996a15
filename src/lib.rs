//! MCP Runtime - a generic Model Context Protocol server
//!
//! Serves explicitly registered tools and resources to MCP clients over
//! stdio. Each request runs inside a task-local request context, so a tool
//! can report progress to the client that called it without threading the
//! session through its arguments.

pub mod builtin;
pub mod config;
pub mod context;
pub mod logging;
pub mod mcp;
pub mod registry;
pub mod types;

pub use config::{load_config, RuntimeConfig};
pub use context::{ProgressSession, ProgressToken, RequestContext};
pub use mcp::McpServer;
pub use registry::{ResourceRegistry, ToolOutput, ToolRegistry};
pub use types::RuntimeError;

//! Tool and resource registries
//!
//! Handlers are registered explicitly at startup, each with the metadata
//! clients see in `tools/list` and `resources/list`.

mod naming;
mod resources;
mod tools;

pub use naming::resolve_tool_name;
pub use resources::{ResourceHandler, ResourceRegistry};
pub use tools::{ToolHandler, ToolOutput, ToolRegistry};

//! MCP protocol types, the stdio server, and its outgoing session

pub mod protocol;
pub mod server;
pub mod session;

pub use server::McpServer;
pub use session::StdioSession;

use anyhow::Result;
use clap::Parser;
use mcp_runtime::builtin::register_builtins;
use mcp_runtime::config::load_config;
use mcp_runtime::logging::configure_logging;
use mcp_runtime::{McpServer, ResourceRegistry, ToolRegistry};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Generic Model Context Protocol server
///
/// Serves the built-in tools and resources to an MCP client over stdio.
#[derive(Parser, Debug)]
#[command(name = "mcp-runtime")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to load (YAML or TOML); may be given more than once
    ///
    /// The first file that exists is used. Without this flag the runtime
    /// checks ./config.yaml and ./config.yml in the current directory, then
    /// MCP_RUNTIME_CONFIG_PATH, then config.yaml in the project root, then
    /// mcp-runtime/config.yaml in the user config directory.
    #[arg(short, long = "config")]
    config: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let paths = (!args.config.is_empty()).then_some(args.config.as_slice());
    let mut config = load_config(paths);
    if let Some(level) = args.log_level {
        config.set("logging.level", Value::String(level));
    }

    configure_logging(&config.logging(), args.log_file.as_deref())?;

    info!("Starting MCP runtime v{}", env!("CARGO_PKG_VERSION"));
    match config.source() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let mut tools = ToolRegistry::new();
    let mut resources = ResourceRegistry::new();
    if config.tools().builtin {
        register_builtins(&mut tools, &mut resources, &config)?;
    }
    info!(
        "Serving {} tools and {} resources",
        tools.len(),
        resources.len()
    );

    let server = McpServer::new(config, tools, resources);
    server.run().await?;

    info!("MCP runtime shut down");
    Ok(())
}

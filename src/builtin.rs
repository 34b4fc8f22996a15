//! Built-in tools and resources
//!
//! Registered at startup when `tools.builtin` is enabled. They double as a
//! smoke test for a client: `echo` round-trips arguments, `ticker` reports
//! progress through the ambient request context.

use crate::config::RuntimeConfig;
use crate::context;
use crate::mcp::protocol::{Resource, Tool};
use crate::registry::{ResourceRegistry, ToolOutput, ToolRegistry};
use crate::types::Result;
use anyhow::Context as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const RUNTIME_CONFIG_URI: &str = "config://runtime";

const MAX_TICKER_STEPS: u64 = 1000;
const DEFAULT_TICKER_DELAY_MS: u64 = 100;

#[derive(Debug, Deserialize)]
struct EchoArgs {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TickerArgs {
    steps: u64,
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    DEFAULT_TICKER_DELAY_MS
}

fn echo_tool() -> Tool {
    Tool {
        name: "echo".to_string(),
        description: "Return the given message unchanged.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Text to send back"
                }
            },
            "required": ["message"]
        }),
    }
}

fn ticker_tool() -> Tool {
    Tool {
        name: "ticker".to_string(),
        description: "Count through a number of steps, reporting progress after each one. Useful for checking that a client receives progress notifications.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_TICKER_STEPS,
                    "description": "Number of steps to count"
                },
                "delay_ms": {
                    "type": "integer",
                    "minimum": 0,
                    "default": DEFAULT_TICKER_DELAY_MS,
                    "description": "Pause before each step, in milliseconds"
                }
            },
            "required": ["steps"]
        }),
    }
}

async fn echo(arguments: Value) -> anyhow::Result<ToolOutput> {
    let args: EchoArgs = serde_json::from_value(arguments).context("Invalid echo arguments")?;
    Ok(ToolOutput::Text(args.message))
}

async fn ticker(arguments: Value) -> anyhow::Result<ToolOutput> {
    let args: TickerArgs =
        serde_json::from_value(arguments).context("Invalid ticker arguments")?;

    let delay = Duration::from_millis(args.delay_ms);
    for step in 1..=args.steps {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let message = format!("Step {}/{}", step, args.steps);
        context::send_progress(step as f64, Some(args.steps as f64), Some(&message)).await;
    }

    Ok(ToolOutput::Json(json!({ "steps": args.steps })))
}

/// Register the built-in tools and the runtime configuration resource.
pub fn register_builtins(
    tools: &mut ToolRegistry,
    resources: &mut ResourceRegistry,
    config: &RuntimeConfig,
) -> Result<()> {
    tools.register_fn(echo_tool(), echo)?;
    tools.register_fn(ticker_tool(), ticker)?;

    // Rendered once; the document does not change after startup.
    let rendered = serde_json::to_string_pretty(config.document())?;
    resources.register_fn(
        Resource {
            uri: RUNTIME_CONFIG_URI.to_string(),
            name: "Runtime configuration".to_string(),
            description: Some("Effective configuration after merging defaults and the config file".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        move || {
            let rendered = rendered.clone();
            async move { Ok(rendered) }
        },
    );

    debug!(
        "Built-in tools registered ({} tools, {} resources in total)",
        tools.len(),
        resources.len()
    );
    Ok(())
}

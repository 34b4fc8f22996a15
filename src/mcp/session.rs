//! Outgoing half of a stdio connection
//!
//! Responses and notifications from every request task funnel through one
//! channel into a single writer, so messages issued by one task reach the
//! client in the order they were sent.

use crate::context::{ProgressSession, ProgressToken};
use crate::mcp::protocol::{JsonRpcNotification, ProgressParams};
use crate::types::{Result, RuntimeError};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

pub const PROGRESS_METHOD: &str = "notifications/progress";

#[derive(Debug, Clone)]
pub struct StdioSession {
    outgoing: mpsc::UnboundedSender<String>,
}

impl StdioSession {
    pub fn new(outgoing: mpsc::UnboundedSender<String>) -> Self {
        Self { outgoing }
    }

    /// Queue one JSON message for the client.
    pub fn send_message<T: Serialize>(&self, message: &T) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.outgoing
            .send(text)
            .map_err(|_| RuntimeError::Transport("client output closed".to_string()))
    }
}

#[async_trait]
impl ProgressSession for StdioSession {
    async fn send_progress_notification(
        &self,
        token: &ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<&str>,
    ) -> Result<()> {
        let params = ProgressParams {
            progress_token: token.clone(),
            progress,
            total,
            message: message.map(str::to_string),
        };
        let notification = JsonRpcNotification::new(PROGRESS_METHOD, serde_json::to_value(params)?);
        self.send_message(&notification)
    }
}

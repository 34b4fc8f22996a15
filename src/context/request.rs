//! Request context value and the session capability it carries

use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Progress token supplied by the client in `_meta.progressToken`.
///
/// JSON-RPC clients use either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    Number(i64),
    Str(String),
}

impl fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressToken::Number(n) => write!(f, "{}", n),
            ProgressToken::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ProgressToken {
    fn from(value: &str) -> Self {
        ProgressToken::Str(value.to_string())
    }
}

impl From<String> for ProgressToken {
    fn from(value: String) -> Self {
        ProgressToken::Str(value)
    }
}

impl From<i64> for ProgressToken {
    fn from(value: i64) -> Self {
        ProgressToken::Number(value)
    }
}

/// A transport channel able to deliver progress notifications to a client.
#[async_trait]
pub trait ProgressSession: Send + Sync {
    async fn send_progress_notification(
        &self,
        token: &ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<&str>,
    ) -> Result<()>;
}

/// Everything a handler may need from the request that triggered it.
///
/// Immutable once built; the ambient value is replaced, never edited.
#[derive(Clone, Default)]
pub struct RequestContext {
    session: Option<Arc<dyn ProgressSession>>,
    progress_token: Option<ProgressToken>,
    metadata: Map<String, Value>,
}

impl RequestContext {
    pub fn new(
        session: Option<Arc<dyn ProgressSession>>,
        progress_token: Option<ProgressToken>,
    ) -> Self {
        Self {
            session,
            progress_token,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn session(&self) -> Option<&Arc<dyn ProgressSession>> {
        self.session.as_ref()
    }

    pub fn progress_token(&self) -> Option<&ProgressToken> {
        self.progress_token.as_ref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Report progress for this request. Never fails.
    ///
    /// Nothing is sent unless the client supplied a progress token. A
    /// transport failure is logged and swallowed so that the work being
    /// described carries on unaffected.
    pub async fn send_progress(&self, progress: f64, total: Option<f64>, message: Option<&str>) {
        let Some(token) = &self.progress_token else {
            trace!("No progress token on request, skipping progress {}", progress);
            return;
        };

        let Some(session) = &self.session else {
            warn!("Progress token {} has no session to report to", token);
            return;
        };

        if let Err(e) = session
            .send_progress_notification(token, progress, total, message)
            .await
        {
            error!("Failed to send progress notification for {}: {}", token, e);
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("has_session", &self.session.is_some())
            .field("progress_token", &self.progress_token)
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::RecordingSession;

    #[test]
    fn test_defaults() {
        let ctx = RequestContext::default();
        assert!(ctx.session().is_none());
        assert!(ctx.progress_token().is_none());
        assert!(ctx.metadata().is_empty());
    }

    #[test]
    fn test_token_from_json() {
        let s: ProgressToken = serde_json::from_value(serde_json::json!("abc")).unwrap();
        assert_eq!(s, ProgressToken::from("abc"));

        let n: ProgressToken = serde_json::from_value(serde_json::json!(12345)).unwrap();
        assert_eq!(n, ProgressToken::Number(12345));
        assert_eq!(serde_json::to_value(&n).unwrap(), serde_json::json!(12345));
    }

    #[test]
    fn test_metadata_kept() {
        let mut meta = Map::new();
        meta.insert("key".into(), Value::from("value"));
        let ctx = RequestContext::new(None, Some("t".into())).with_metadata(meta);
        assert_eq!(ctx.metadata().get("key"), Some(&Value::from("value")));
    }

    #[tokio::test]
    async fn test_send_with_session_and_token() {
        let session = RecordingSession::new();
        let ctx = RequestContext::new(Some(session.clone()), Some("test-token".into()));

        ctx.send_progress(50.0, Some(100.0), Some("Half done")).await;

        assert_eq!(
            session.calls(),
            vec![(
                ProgressToken::from("test-token"),
                50.0,
                Some(100.0),
                Some("Half done".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_send_without_token_skips_session() {
        let session = RecordingSession::new();
        let ctx = RequestContext::new(Some(session.clone()), None);

        ctx.send_progress(50.0, Some(100.0), None).await;

        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let ctx = RequestContext::new(None, Some("test-token".into()));
        ctx.send_progress(50.0, Some(100.0), None).await;
    }

    #[tokio::test]
    async fn test_integer_token_forwarded() {
        let session = RecordingSession::new();
        let ctx = RequestContext::new(Some(session.clone()), Some(12345.into()));

        ctx.send_progress(10.0, Some(100.0), None).await;

        assert_eq!(
            session.calls(),
            vec![(ProgressToken::Number(12345), 10.0, Some(100.0), None)]
        );
    }

    #[tokio::test]
    async fn test_step_counting() {
        let session = RecordingSession::new();
        let ctx = RequestContext::new(Some(session.clone()), Some("steps".into()));

        for step in 1..=5 {
            let message = format!("Step {}", step);
            ctx.send_progress(step as f64, Some(5.0), Some(&message)).await;
        }

        let calls = session.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[4].1, 5.0);
        assert_eq!(calls[4].3.as_deref(), Some("Step 5"));
    }

    #[tokio::test]
    async fn test_send_failure_swallowed() {
        let session = RecordingSession::failing();
        let ctx = RequestContext::new(Some(session.clone()), Some("test-token".into()));

        ctx.send_progress(50.0, None, None).await;

        assert_eq!(session.attempts(), 1);
    }
}

//! Request-scoped context and progress reporting
//!
//! Every request a server handles runs inside an activation that makes
//! its [`RequestContext`] ambient for the current task. Handlers deep in
//! the call graph call [`send_progress`] without receiving the context
//! explicitly. The ambient slot is task-local, so concurrently handled
//! requests never see each other's session or progress token.

mod request;
mod scope;

pub use request::{ProgressSession, ProgressToken, RequestContext};
pub use scope::{activate, activate_sync, current, send_progress, set_current, spawn};

#[cfg(test)]
pub(crate) mod testing {
    use super::{ProgressSession, ProgressToken};
    use crate::types::{Result, RuntimeError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub type Call = (ProgressToken, f64, Option<f64>, Option<String>);

    /// Session double that records every notification it is asked to send.
    #[derive(Default)]
    pub struct RecordingSession {
        calls: Mutex<Vec<Call>>,
        attempts: AtomicUsize,
        fail: bool,
    }

    impl RecordingSession {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::default()
            })
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProgressSession for RecordingSession {
        async fn send_progress_notification(
            &self,
            token: &ProgressToken,
            progress: f64,
            total: Option<f64>,
            message: Option<&str>,
        ) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RuntimeError::Transport("client disconnected".into()));
            }
            self.calls.lock().unwrap().push((
                token.clone(),
                progress,
                total,
                message.map(str::to_string),
            ));
            Ok(())
        }
    }
}

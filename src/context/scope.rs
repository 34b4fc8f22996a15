//! Ambient context cell and scoped activation

use super::RequestContext;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Slot = RefCell<Option<Arc<RequestContext>>>;

tokio::task_local! {
    static CURRENT: Slot;
}

thread_local! {
    // Only consulted outside tokio tasks. Worker threads are shared by
    // many tasks, so tasks never read or write it.
    static FALLBACK: Slot = const { RefCell::new(None) };
}

fn in_task() -> bool {
    tokio::task::try_id().is_some()
}

/// The context installed for the running task, if any.
///
/// A tokio task outside any activation has no context.
pub fn current() -> Option<Arc<RequestContext>> {
    CURRENT
        .try_with(|slot| slot.borrow().clone())
        .unwrap_or_else(|_| {
            if in_task() {
                None
            } else {
                FALLBACK.with(|slot| slot.borrow().clone())
            }
        })
}

/// Replace the ambient context. `None` clears it.
///
/// Inside an activation this only affects that activation: the value that
/// was ambient before it is restored when it exits. On a tokio task with no
/// activation the call is ignored with a warning; use [`activate`] there.
pub fn set_current(ctx: Option<Arc<RequestContext>>) {
    if CURRENT
        .try_with(|slot| *slot.borrow_mut() = ctx.clone())
        .is_ok()
    {
        return;
    }

    if let Some(task) = tokio::task::try_id() {
        warn!(
            "set_current on task {} outside a request activation ignored",
            task
        );
        return;
    }

    FALLBACK.with(|slot| *slot.borrow_mut() = ctx);
}

/// Run `work` with `ctx` installed as the ambient context.
///
/// The previous context becomes visible again however the future ends:
/// completion, an `Err` output, a panic, or being dropped before completion.
/// The output of `work` is returned untouched.
pub async fn activate<F, Fut>(ctx: RequestContext, work: F) -> Fut::Output
where
    F: FnOnce(Arc<RequestContext>) -> Fut,
    Fut: Future,
{
    let ctx = Arc::new(ctx);
    debug!(
        "Activating request context (progress token: {:?})",
        ctx.progress_token()
    );

    let slot = RefCell::new(Some(Arc::clone(&ctx)));
    CURRENT.scope(slot, async move { work(ctx).await }).await
}

/// Synchronous counterpart of [`activate`].
pub fn activate_sync<F, R>(ctx: RequestContext, work: F) -> R
where
    F: FnOnce(Arc<RequestContext>) -> R,
{
    let ctx = Arc::new(ctx);
    let slot = RefCell::new(Some(Arc::clone(&ctx)));
    CURRENT.sync_scope(slot, || work(ctx))
}

/// Spawn a task that inherits the caller's ambient context.
///
/// A plain `tokio::spawn` starts with no context at all.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(ctx) => tokio::spawn(CURRENT.scope(RefCell::new(Some(ctx)), future)),
        None => tokio::spawn(future),
    }
}

/// Report progress for the request being handled by this task.
///
/// Best-effort: without an ambient context, or without a progress token,
/// this does nothing. Transport failures are logged, never returned.
pub async fn send_progress(progress: f64, total: Option<f64>, message: Option<&str>) {
    match current() {
        Some(ctx) => ctx.send_progress(progress, total, message).await,
        None => debug!("send_progress({}) called outside a request context", progress),
    }
}

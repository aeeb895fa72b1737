//! Registry for work that outlives the request that started it.
//!
//! Handlers answer immediately and hand reconciliation to [`BackgroundTasks`].
//! At shutdown the server calls [`BackgroundTasks::drain`] so queued writes
//! get a chance to land before the process exits.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;

/// Cloneable handle to a shared [`JoinSet`].
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` in the background and track it until it finishes.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.inner.lock();
        while let Some(result) = set.try_join_next() {
            log_join_error(result);
        }
        set.spawn(task);
        metrics::gauge!("tracking_tasks_in_flight").set(set.len() as f64);
    }

    /// Tasks spawned and not yet reaped. May include finished tasks that
    /// nobody has collected yet.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().len()
    }

    /// Wait up to `timeout` for all tracked tasks. Returns how many were
    /// still running (and were aborted) when time ran out.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let mut set = std::mem::take(&mut *self.inner.lock());
        let pending = set.len();
        if pending > 0 {
            tracing::info!(pending, "draining background tasks");
        }

        let finished = tokio::time::timeout(timeout, async {
            while let Some(result) = set.join_next().await {
                log_join_error(result);
            }
        })
        .await;

        let abandoned = if finished.is_ok() { 0 } else { set.len() };
        if abandoned > 0 {
            tracing::warn!(abandoned, "shutdown drain timed out, aborting remaining tasks");
            set.abort_all();
        }
        metrics::gauge!("tracking_tasks_in_flight").set(0.0);
        abandoned
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "background task panicked");
    }
}

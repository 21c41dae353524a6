//! Bounded-concurrency fetch queue
//!
//! Each submitted request waits for a permit, sleeps a random delay, fetches
//! its URL and hands the body to the submitter's completion callback along
//! with the context it was submitted with. Failed fetches are logged and
//! counted; the callback only sees successful bodies.

use crate::config::ScraperConfig;
use crate::core::Fetcher;
use crate::core::log::scrape_unit_span;
use crate::scrape::report::StageCounters;
use rand::Rng;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};
use tracing::{Instrument, debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// No pending work.
    Idle,
    /// Accepting submissions with work in flight.
    Dispatching,
    /// Closed to submissions, finishing work in flight.
    Draining,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("{stage} queue is closed")]
    Closed { stage: &'static str },
}

struct QueueInner {
    stage: &'static str,
    fetcher: Arc<dyn Fetcher>,
    permits: Semaphore,
    min_delay_ms: u64,
    max_delay_ms: u64,
    pending: AtomicUsize,
    closed: AtomicBool,
    idle: Notify,
    counters: StageCounters,
}

impl QueueInner {
    fn jitter(&self) -> Duration {
        let ms = if self.max_delay_ms > self.min_delay_ms {
            rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms)
        } else {
            self.min_delay_ms
        };
        Duration::from_millis(ms)
    }

    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Marks one submission finished when dropped, including on unwind out of a
/// completion handler.
struct PendingGuard(Arc<QueueInner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[derive(Clone)]
pub struct FetchQueue {
    inner: Arc<QueueInner>,
}

impl FetchQueue {
    pub fn new(stage: &'static str, fetcher: Arc<dyn Fetcher>, settings: &ScraperConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                stage,
                fetcher,
                permits: Semaphore::new(settings.parallelism.max(1)),
                min_delay_ms: settings.min_delay_ms,
                max_delay_ms: settings.max_delay_ms,
                pending: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                idle: Notify::new(),
                counters: StageCounters::default(),
            }),
        }
    }

    pub fn stage(&self) -> &'static str {
        self.inner.stage
    }

    pub fn counters(&self) -> &StageCounters {
        &self.inner.counters
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> QueueState {
        if self.pending() == 0 {
            QueueState::Idle
        } else if self.inner.closed.load(Ordering::SeqCst) {
            QueueState::Draining
        } else {
            QueueState::Dispatching
        }
    }

    pub fn open(&self) {
        self.inner.closed.store(false, Ordering::SeqCst);
    }

    /// Stops accepting submissions. Work already submitted still runs.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    /// Schedules a fetch of `url`. `on_complete` runs with `context` and the
    /// response body once the fetch succeeds.
    pub fn submit<C, F, Fut>(&self, url: String, context: C, on_complete: F) -> Result<(), QueueError>
    where
        C: Debug + Send + 'static,
        F: FnOnce(C, Vec<u8>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed {
                stage: self.inner.stage,
            });
        }

        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        self.inner.counters.record_request();
        let inner = Arc::clone(&self.inner);
        let span = scrape_unit_span(inner.stage);

        tokio::spawn(
            async move {
                let _pending = PendingGuard(Arc::clone(&inner));
                let result = {
                    // Permit covers the delay and the request, not the handler.
                    let _permit = inner.permits.acquire().await.ok();
                    tokio::time::sleep(inner.jitter()).await;
                    inner.fetcher.fetch(&url).await
                };

                match result {
                    Ok(body) => {
                        debug!(url = %url, bytes = body.len(), "Fetched");
                        inner.counters.record_fetched();
                        on_complete(context, body).await;
                    }
                    Err(e) => {
                        warn!(url = %url, ?context, error = %e, "Fetch failed");
                        inner.counters.record_fetch_failure();
                    }
                }
            }
            .instrument(span),
        );
        Ok(())
    }

    /// Resolves once no submitted work is pending.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

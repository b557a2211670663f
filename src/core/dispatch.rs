//! # Dispatcher: bounded-concurrency fan-out of decoded records.
//!
//! One dispatch loop drains the intake queue. For each record it snapshots the
//! handlers subscribed to the record's topic and launches one invocation per
//! handler, each holding a permit of the global semaphore.
//!
//! ## Architecture
//! ```text
//! workers ──► [intake (bounded mpsc)] ──► dispatch loop
//!                                            │ for each handler:
//!                                            │   acquire permit (waits when saturated)
//!                                            ▼
//!                            spawn invocation (tracked) ──► handler.handle(record)
//!                                  ├─ Ok     ─► record.mark_processed()
//!                                  ├─ Err    ─► warn!, record.mark_failed()
//!                                  └─ panic  ─► error!, record.mark_failed()
//!                                  (permit released on completion)
//! ```
//!
//! ## Rules
//! - At most `limit` invocations run at once, across all topics.
//! - Waiting for a permit suspends the loop only; running invocations never
//!   wait on the loop, so the drain cannot deadlock.
//! - A saturated semaphore stops the intake drain, which in turn suspends the
//!   consumer workers on the full intake (backpressure).
//! - Handler errors and panics are contained in their invocation.
//! - No ordering across handlers or records once fan-out begins.
//! - Cancellation stops the loop at its next suspension point; invocations
//!   already launched run to completion.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::subscriptions::SubscriptionTable;
use crate::events::EventRecord;
use crate::handlers::HandlerRef;

/// Fan-out stage between the intake queue and the handlers.
pub(crate) struct Dispatcher {
    subscriptions: Arc<SubscriptionTable>,
    semaphore: Arc<Semaphore>,
    in_flight: TaskTracker,
}

impl Dispatcher {
    /// Creates a dispatcher enforcing `limit` concurrent invocations (min 1).
    pub(crate) fn new(
        subscriptions: Arc<SubscriptionTable>,
        limit: usize,
        in_flight: TaskTracker,
    ) -> Self {
        Self {
            subscriptions,
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            in_flight,
        }
    }

    /// Spawns the dispatch loop.
    pub(crate) fn spawn(
        self,
        intake: mpsc::Receiver<Arc<EventRecord>>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(intake, token))
    }

    async fn run(self, mut intake: mpsc::Receiver<Arc<EventRecord>>, token: CancellationToken) {
        loop {
            let record = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = intake.recv() => match next {
                    Some(record) => record,
                    None => break,
                },
            };
            if !self.dispatch(record, &token).await {
                break;
            }
        }
        tracing::debug!("dispatch loop stopped");
    }

    /// Fans `record` out to every current subscriber of its topic.
    ///
    /// Returns `false` if cancelled while waiting for a permit.
    async fn dispatch(&self, record: Arc<EventRecord>, token: &CancellationToken) -> bool {
        let handlers = self.subscriptions.handlers(record.topic());
        if handlers.is_empty() {
            tracing::trace!(
                topic = record.topic(),
                event = record.name(),
                "no subscribers; record dropped"
            );
            return true;
        }

        for handler in handlers {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => return false,
                res = Arc::clone(&self.semaphore).acquire_owned() => match res {
                    Ok(permit) => permit,
                    Err(_closed) => return false,
                },
            };
            self.in_flight
                .spawn(invoke(handler, Arc::clone(&record), permit));
        }
        true
    }
}

/// Runs one handler invocation and records its outcome on `record`.
async fn invoke(handler: HandlerRef, record: Arc<EventRecord>, _permit: OwnedSemaphorePermit) {
    let fut = handler.handle(Arc::clone(&record));
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => record.mark_processed(),
        Ok(Err(e)) => {
            tracing::warn!(
                topic = record.topic(),
                event = record.name(),
                handler = handler.event_name(),
                label = e.as_label(),
                error = %e,
                "handler failed"
            );
            record.mark_failed();
        }
        Err(panic_err) => {
            let info = {
                let any = &*panic_err;
                if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                }
            };
            tracing::error!(
                topic = record.topic(),
                event = record.name(),
                handler = handler.event_name(),
                panic = %info,
                "handler panicked"
            );
            record.mark_failed();
        }
    }
}

//! # ConsumerPool: per-topic consumer-group workers.
//!
//! A pool is started once per topic on its first subscription. It runs a fixed
//! number of workers, all joined to the same consumer group, so the transport
//! splits the topic's messages across them without duplicates.
//!
//! ## Architecture
//! ```text
//! ConsumerPool::start(topic, group, n)
//!   └─► worker × n ─► connect (retry with backoff)
//!
//! worker loop {
//!   ├─► recv()            (cancellable)
//!   │     ├─ Closed       → exit
//!   │     └─ Err          → warn!, backoff sleep (cancellable), continue
//!   ├─► headers → (schema_id, event name)
//!   │     └─ no schema id → warn!, drop message, continue
//!   ├─► schema cache decode  (cancellable)
//!   │     └─ Err          → warn!, drop message, continue
//!   └─► intake.send(record)  (suspends while the intake is full)
//! }
//! ```
//!
//! ## Rules
//! - Workers never stop on a consume error; only cancellation or
//!   [`TransportError::Closed`] ends them.
//! - The consecutive error count resets on the next successful receive.
//! - Dropped messages are not redelivered; offsets are owned by the transport.
//! - Cancellation is observed at every suspension point: connect, receive,
//!   schema fetch, backoff and intake send.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::TransportError;
use crate::events::{EventRecord, INVALID_SCHEMA_ID};
use crate::policies::BackoffPolicy;
use crate::ports::{Codec, Message, Transport, TransportConsumer};
use crate::schema::SchemaCache;

/// Shared collaborators handed to every worker.
pub(crate) struct PoolContext<C: Codec> {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) schemas: Arc<SchemaCache<C>>,
    pub(crate) intake: mpsc::Sender<Arc<EventRecord>>,
    pub(crate) backoff: BackoffPolicy,
}

impl<C: Codec> Clone for PoolContext<C> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            schemas: Arc::clone(&self.schemas),
            intake: self.intake.clone(),
            backoff: self.backoff,
        }
    }
}

/// Handle to the running workers of one topic.
#[derive(Clone)]
pub(crate) struct ConsumerPool {
    workers: TaskTracker,
}

impl ConsumerPool {
    /// Spawns `size` workers (min 1) for `topic` under a child of `parent`.
    pub(crate) fn start<C: Codec>(
        topic: &str,
        group: &str,
        size: usize,
        ctx: &PoolContext<C>,
        parent: &CancellationToken,
    ) -> Self {
        let size = size.max(1);
        let token = parent.child_token();
        let workers = TaskTracker::new();

        for index in 0..size {
            let worker = Worker {
                index,
                topic: topic.to_string(),
                group: group.to_string(),
                ctx: ctx.clone(),
            };
            workers.spawn(worker.run(token.clone()));
        }
        workers.close();

        tracing::debug!(topic, group, workers = size, "consumer pool started");
        Self { workers }
    }

    /// Waits until every worker has exited.
    pub(crate) async fn join(&self) {
        self.workers.wait().await;
    }
}

struct Worker<C: Codec> {
    index: usize,
    topic: String,
    group: String,
    ctx: PoolContext<C>,
}

impl<C: Codec> Worker<C> {
    async fn run(self, token: CancellationToken) {
        let Some(mut consumer) = self.connect(&token).await else {
            tracing::debug!(topic = %self.topic, worker = self.index, "worker stopped before connecting");
            return;
        };
        tracing::debug!(topic = %self.topic, group = %self.group, worker = self.index, "worker connected");

        let mut failures: u32 = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                res = consumer.recv() => res,
            };
            match next {
                Ok(message) => {
                    failures = 0;
                    if !self.forward(message, &token).await {
                        break;
                    }
                }
                Err(TransportError::Closed) => break,
                Err(e) => {
                    tracing::warn!(
                        topic = %self.topic,
                        worker = self.index,
                        label = e.as_label(),
                        error = %e,
                        "consume failed"
                    );
                    let delay = self.ctx.backoff.next(failures);
                    failures = failures.saturating_add(1);
                    if !sleep_or_cancel(delay, &token).await {
                        break;
                    }
                }
            }
        }

        consumer.close().await;
        tracing::debug!(topic = %self.topic, worker = self.index, "worker stopped");
    }

    /// Joins the consumer group, retrying with backoff until it succeeds.
    ///
    /// Returns `None` on cancellation or a closed transport.
    async fn connect(&self, token: &CancellationToken) -> Option<Box<dyn TransportConsumer>> {
        let mut attempt: u32 = 0;
        loop {
            let res = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                res = self.ctx.transport.subscribe(&self.topic, &self.group) => res,
            };
            match res {
                Ok(consumer) => return Some(consumer),
                Err(TransportError::Closed) => return None,
                Err(e) => {
                    tracing::warn!(
                        topic = %self.topic,
                        group = %self.group,
                        worker = self.index,
                        label = e.as_label(),
                        error = %e,
                        "connect failed"
                    );
                    let delay = self.ctx.backoff.next(attempt);
                    attempt = attempt.saturating_add(1);
                    if !sleep_or_cancel(delay, token).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Decodes `message` and pushes it to the intake.
    ///
    /// Returns `false` if the worker should stop.
    async fn forward(&self, message: Message, token: &CancellationToken) -> bool {
        let schema_id = message.headers.schema_id();
        let name = message.headers.event_name();

        if schema_id == INVALID_SCHEMA_ID {
            tracing::warn!(topic = %self.topic, event = %name, "message dropped: no schema id");
            return true;
        }

        let res = tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            res = self.ctx.schemas.decode(schema_id, &message.payload) => res,
        };
        let decoded = match res {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    topic = %self.topic,
                    event = %name,
                    schema_id,
                    label = e.as_label(),
                    error = %e,
                    "message dropped: decode failed"
                );
                return true;
            }
        };

        let record = Arc::new(
            EventRecord::new(self.topic.as_str(), name, message.payload, schema_id)
                .with_decoded(decoded),
        );
        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            res = self.ctx.intake.send(record) => res.is_ok(),
        }
    }
}

/// Sleeps for `delay`. Returns `false` if cancelled first.
async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

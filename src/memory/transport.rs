//! # In-process log transport.
//!
//! [`MemoryTransport`] keeps one append-only log per topic and one committed
//! offset per `(topic, group)`.
//!
//! ## Semantics
//! - A new group starts at the earliest message.
//! - Receiving a message advances the group's offset immediately (auto-commit),
//!   so members of one group never see the same message twice.
//! - Every group sees every message of the topic.
//! - `close()` fails further sends and wakes blocked consumers with
//!   [`TransportError::Closed`].
//!
//! ```text
//! send ──► [ m0 | m1 | m2 | m3 | ... ]   topic log
//!                      ▲          ▲
//!             group-a offset   group-b offset
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, Notify};

use crate::error::TransportError;
use crate::events::Headers;
use crate::ports::{Message, Transport, TransportConsumer};

#[derive(Default)]
struct LogState {
    messages: Vec<Message>,
    offsets: HashMap<String, usize>,
}

#[derive(Default)]
struct TopicLog {
    state: Mutex<LogState>,
    appended: Notify,
}

#[derive(Default)]
struct Shared {
    topics: Mutex<HashMap<String, Arc<TopicLog>>>,
    closed: AtomicBool,
    closed_notify: Notify,
}

impl Shared {
    async fn topic(&self, name: &str) -> Arc<TopicLog> {
        let mut topics = self.topics.lock().await;
        Arc::clone(topics.entry(name.to_string()).or_default())
    }
}

/// In-process [`Transport`] with consumer-group semantics.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages appended to `topic`.
    pub async fn len(&self, topic: &str) -> usize {
        self.shared.topic(topic).await.state.lock().await.messages.len()
    }

    /// Committed offset of `group` on `topic` (0 if the group never consumed).
    pub async fn committed(&self, topic: &str, group: &str) -> usize {
        let log = self.shared.topic(topic).await;
        let state = log.state.lock().await;
        state.offsets.get(group).copied().unwrap_or(0)
    }

    /// Snapshot of all messages appended to `topic`.
    pub async fn messages(&self, topic: &str) -> Vec<Message> {
        self.shared.topic(topic).await.state.lock().await.messages.clone()
    }

    /// True once [`Transport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: Bytes,
        headers: Headers,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let log = self.shared.topic(topic).await;
        log.state.lock().await.messages.push(Message {
            topic: topic.to_string(),
            key: Some(key.to_string()),
            payload,
            headers,
        });
        log.appended.notify_waiters();
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn TransportConsumer>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let log = self.shared.topic(topic).await;
        log.state
            .lock()
            .await
            .offsets
            .entry(group.to_string())
            .or_insert(0);
        Ok(Box::new(MemoryConsumer {
            shared: Arc::clone(&self.shared),
            log,
            group: group.to_string(),
        }))
    }

    async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.closed_notify.notify_waiters();
    }
}

struct MemoryConsumer {
    shared: Arc<Shared>,
    log: Arc<TopicLog>,
    group: String,
}

#[async_trait]
impl TransportConsumer for MemoryConsumer {
    async fn recv(&mut self) -> Result<Message, TransportError> {
        loop {
            // Register interest before checking state so a concurrent append is not missed.
            let appended = self.log.appended.notified();
            let closed = self.shared.closed_notify.notified();
            tokio::pin!(appended, closed);
            appended.as_mut().enable();
            closed.as_mut().enable();

            if self.shared.closed.load(Ordering::Acquire) {
                return Err(TransportError::Closed);
            }

            {
                let mut state = self.log.state.lock().await;
                let LogState { messages, offsets } = &mut *state;
                let offset = offsets.entry(self.group.clone()).or_insert(0);
                if let Some(message) = messages.get(*offset) {
                    *offset += 1;
                    return Ok(message.clone());
                }
            }

            tokio::select! {
                _ = &mut appended => {}
                _ = &mut closed => {}
            }
        }
    }
}

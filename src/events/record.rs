//! # Event records flowing through the broker.
//!
//! An [`EventRecord`] describes one message: its topic, logical name, encoded
//! payload and schema id. These are fixed at construction. Only the decoded body
//! (attached by a consumer worker before the record is shared) and the
//! processing [`EventStatus`] change afterwards.
//!
//! ## Status lifecycle
//! ```text
//! New ──► Processed   (handler returned Ok)
//!    └──► Failed      (handler returned Err or panicked)
//! ```
//! A record delivered to several handlers keeps a single status: the outcome
//! of whichever invocation finished last.

use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use bytes::Bytes;
use uuid::Uuid;

use super::headers::SchemaId;

/// Structured body produced by decoding a payload against its schema.
pub type Record = serde_json::Value;

/// Processing status of an [`EventRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// Constructed, not yet handled.
    New,
    /// The last handler invocation succeeded.
    Processed,
    /// The last handler invocation failed.
    Failed,
}

#[derive(Debug)]
struct StatusState {
    status: EventStatus,
    updated_at: SystemTime,
}

/// One event, either built by a producer or decoded by a consumer worker.
#[derive(Debug)]
pub struct EventRecord {
    id: Uuid,
    topic: String,
    name: String,
    payload: Bytes,
    schema_id: SchemaId,
    decoded: Option<Record>,
    created_at: SystemTime,
    state: RwLock<StatusState>,
}

impl EventRecord {
    /// Creates a record with status [`EventStatus::New`] and a fresh id.
    ///
    /// # Example
    /// ```
    /// use eventlane::{EventRecord, EventStatus};
    ///
    /// let record = EventRecord::new("orders", "OrderCreated", vec![2u8, 0], 7);
    /// assert_eq!(record.topic(), "orders");
    /// assert_eq!(record.status(), EventStatus::New);
    /// assert!(record.decoded().is_none());
    /// ```
    pub fn new(
        topic: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<Bytes>,
        schema_id: SchemaId,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            name: name.into(),
            payload: payload.into(),
            schema_id,
            decoded: None,
            created_at: now,
            state: RwLock::new(StatusState {
                status: EventStatus::New,
                updated_at: now,
            }),
        }
    }

    /// Attaches the decoded body.
    #[must_use]
    pub fn with_decoded(mut self, decoded: Record) -> Self {
        self.decoded = Some(decoded);
        self
    }

    /// Unique record id; used as the partition key on publish.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Transport-level channel.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Logical event type, used for handler routing.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoded body.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Schema the payload was encoded with.
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// Decoded body (consume path only).
    pub fn decoded(&self) -> Option<&Record> {
        self.decoded.as_ref()
    }

    /// Reads one top-level field of the decoded body.
    pub fn field(&self, name: &str) -> Option<&Record> {
        self.decoded.as_ref().and_then(|d| d.get(name))
    }

    /// Current processing status.
    pub fn status(&self) -> EventStatus {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Construction time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Time of the last status transition (construction time if none).
    pub fn updated_at(&self) -> SystemTime {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .updated_at
    }

    /// Marks the record as successfully handled.
    pub fn mark_processed(&self) {
        self.set_status(EventStatus::Processed);
    }

    /// Marks the record as failed.
    pub fn mark_failed(&self) {
        self.set_status(EventStatus::Failed);
    }

    fn set_status(&self, status: EventStatus) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.status = status;
        state.updated_at = SystemTime::now();
    }
}

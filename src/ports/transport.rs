//! # Transport port.
//!
//! The broker talks to the partitioned log (Kafka or similar) only through
//! [`Transport`] and the per-worker [`TransportConsumer`] it hands out.
//!
//! ## Contract
//! - `send` hands a keyed, headered message to the client; `Ok` means
//!   "accepted locally", not "durably committed".
//! - `subscribe(topic, group)` joins a consumer group. Consumers of the same
//!   group share the topic's messages without duplicate delivery; distinct
//!   groups each see every message.
//! - Offset commits are owned by the implementation; the broker never commits
//!   or rewinds.
//! - `TransportConsumer::recv` blocks until a message is available. Returning
//!   [`TransportError::Closed`] ends the calling worker; any other error is
//!   logged and the worker keeps pulling.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::events::Headers;

/// Raw message as carried by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Topic the message belongs to.
    pub topic: String,
    /// Partition key.
    pub key: Option<String>,
    /// Encoded body.
    pub payload: Bytes,
    /// Message headers.
    pub headers: Headers,
}

/// Producer side of the transport and factory for group consumers.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Submits one message.
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: Bytes,
        headers: Headers,
    ) -> Result<(), TransportError>;

    /// Creates a consumer joined to `group` on `topic`.
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn TransportConsumer>, TransportError>;

    /// Waits (up to `timeout`) for buffered outbound messages to be delivered.
    async fn flush(&self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    /// Releases client resources. Called once during broker shutdown.
    async fn close(&self) {}
}

/// One member of a consumer group.
#[async_trait]
pub trait TransportConsumer: Send + 'static {
    /// Pulls the next message, waiting until one is available.
    async fn recv(&mut self) -> Result<Message, TransportError>;

    /// Leaves the group. Called once when the owning worker exits.
    async fn close(&mut self) {}
}

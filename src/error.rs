//! Error types used by the broker, its ports and event handlers.
//!
//! - [`TransportError`]: failures reported by the transport port.
//! - [`SchemaError`]: registry lookups, schema parsing and payload codecs.
//! - [`HandlerError`]: returned by event handlers; always contained by dispatch.
//! - [`BrokerError`]: surfaced only by the fallible producer-side helpers.
//!
//! Every enum provides `as_label` (a stable snake_case label for logs).

use thiserror::Error;

use crate::events::SchemaId;

/// # Errors produced by a transport implementation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The message could not be handed to the transport client.
    #[error("send to '{topic}' failed: {error}")]
    Send {
        /// Destination topic.
        topic: String,
        /// Underlying error message.
        error: String,
    },

    /// Pulling the next message failed (connectivity, rebalance, ...).
    #[error("consume from '{topic}' failed: {error}")]
    Consume {
        /// Source topic.
        topic: String,
        /// Underlying error message.
        error: String,
    },

    /// A consumer could not be attached to its group.
    #[error("connect to '{topic}' as '{group}' failed: {error}")]
    Connect {
        /// Source topic.
        topic: String,
        /// Consumer group identity.
        group: String,
        /// Underlying error message.
        error: String,
    },

    /// The transport (or this consumer) has been closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use eventlane::TransportError;
    ///
    /// assert_eq!(TransportError::Closed.as_label(), "transport_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Send { .. } => "transport_send",
            TransportError::Consume { .. } => "transport_consume",
            TransportError::Connect { .. } => "transport_connect",
            TransportError::Closed => "transport_closed",
        }
    }
}

/// # Errors produced while resolving schemas or coding payloads.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The registry has no schema under this id.
    #[error("schema {id} not found")]
    NotFound {
        /// Requested schema id.
        id: SchemaId,
    },

    /// The registry could not be reached or rejected the request.
    #[error("schema registry failure: {error}")]
    Registry {
        /// Underlying error message.
        error: String,
    },

    /// The schema definition could not be parsed by the codec.
    #[error("invalid schema definition: {error}")]
    Invalid {
        /// Underlying error message.
        error: String,
    },

    /// The payload does not decode against the schema.
    #[error("decode failed: {error}")]
    Decode {
        /// Underlying error message.
        error: String,
    },

    /// The record does not encode against the schema.
    #[error("encode failed: {error}")]
    Encode {
        /// Underlying error message.
        error: String,
    },
}

impl SchemaError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchemaError::NotFound { .. } => "schema_not_found",
            SchemaError::Registry { .. } => "schema_registry",
            SchemaError::Invalid { .. } => "schema_invalid",
            SchemaError::Decode { .. } => "schema_decode",
            SchemaError::Encode { .. } => "schema_encode",
        }
    }
}

/// # Errors returned by event handlers.
///
/// Handler errors never escape dispatch: they are logged and the record is
/// marked [`EventStatus::Failed`](crate::EventStatus::Failed).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Processing failed.
    #[error("handler failed: {error}")]
    Fail {
        /// Underlying error message.
        error: String,
    },

    /// The decoded record lacks a field the handler requires.
    #[error("missing field '{field}'")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// The record carries no decoded body.
    #[error("record was not decoded")]
    NotDecoded,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use eventlane::HandlerError;
    ///
    /// assert_eq!(HandlerError::fail("boom").as_label(), "handler_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::MissingField { .. } => "handler_missing_field",
            HandlerError::NotDecoded => "handler_not_decoded",
        }
    }
}

/// # Errors surfaced by the broker's producer-side helpers.
///
/// `publish`, `subscribe`, `unsubscribe` and `shutdown` never fail; this type is
/// only returned by schema registration and record encoding.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Schema failure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The broker has already been shut down.
    #[error("broker is shut down")]
    ShutDown,
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::Transport(e) => e.as_label(),
            BrokerError::Schema(e) => e.as_label(),
            BrokerError::ShutDown => "broker_shut_down",
        }
    }
}

//! Event data model: records, statuses and the header wire contract.
//!
//! ## Contents
//! - [`EventRecord`], [`EventStatus`] one message plus its processing status
//! - [`Headers`] ordered header multi-map with the `schemaId`/`eventName` contract
//! - [`Record`] decoded structured body (`serde_json::Value`)

mod headers;
mod record;

pub use headers::{
    EVENT_NAME_HEADER, Headers, INVALID_SCHEMA_ID, SCHEMA_ID_HEADER, SchemaId, UNKNOWN_EVENT_NAME,
};
pub use record::{EventRecord, EventStatus, Record};

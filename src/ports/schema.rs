//! # Schema port and codec seam.
//!
//! [`SchemaRegistry`] stores schema definitions by integer id. [`Codec`] knows
//! the schema language: it parses definitions and moves payloads between bytes
//! and [`Record`]s. The broker only ever asks "given bytes and a schema id,
//! produce a structured record" (and the reverse on the producer side).

use async_trait::async_trait;

use crate::error::SchemaError;
use crate::events::{Record, SchemaId};

/// Id-keyed store of schema definitions.
#[async_trait]
pub trait SchemaRegistry: Send + Sync + 'static {
    /// Registers `definition` under `subject` and returns its id.
    async fn register_schema(&self, subject: &str, definition: &str)
    -> Result<SchemaId, SchemaError>;

    /// Fetches the definition stored under `id`.
    async fn get_schema(&self, id: SchemaId) -> Result<String, SchemaError>;

    /// Releases client resources. Called once during broker shutdown.
    async fn close(&self) {}
}

/// Schema language plug-in.
pub trait Codec: Send + Sync + 'static {
    /// Parsed schema representation.
    type Schema: Send + Sync + 'static;

    /// Parses a schema definition.
    fn parse(&self, definition: &str) -> Result<Self::Schema, SchemaError>;

    /// Decodes `payload` against `schema`.
    fn decode(&self, schema: &Self::Schema, payload: &[u8]) -> Result<Record, SchemaError>;

    /// Encodes `record` against `schema`.
    fn encode(&self, schema: &Self::Schema, record: &Record) -> Result<Vec<u8>, SchemaError>;
}

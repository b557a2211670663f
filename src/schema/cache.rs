//! # SchemaCache: local memoization of parsed schemas.
//!
//! Sits between consumer workers (decode) / producer helpers (encode) and the
//! [`SchemaRegistry`]. A hit is a map lookup with no I/O; a miss fetches the
//! definition once, parses it with the [`Codec`] and stores the result.
//!
//! ## Rules
//! - Append-only: entries are never evicted or replaced.
//! - Concurrent misses for the same id may fetch twice; the first insert wins
//!   and every caller receives that instance.
//! - Failed fetches or parses are not cached, so a later call retries.
//! - Map shards are locked only around the lookup/insert, never across I/O.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::SchemaError;
use crate::events::{Record, SchemaId};
use crate::ports::{Codec, SchemaRegistry};

/// Append-only `schema id → parsed schema` cache backed by a registry.
pub struct SchemaCache<C: Codec> {
    registry: Arc<dyn SchemaRegistry>,
    codec: C,
    schemas: DashMap<SchemaId, Arc<C::Schema>>,
}

impl<C: Codec> SchemaCache<C> {
    /// Creates an empty cache.
    pub fn new(registry: Arc<dyn SchemaRegistry>, codec: C) -> Self {
        Self {
            registry,
            codec,
            schemas: DashMap::new(),
        }
    }

    /// Returns the parsed schema for `id`, fetching it on first use.
    pub async fn resolve(&self, id: SchemaId) -> Result<Arc<C::Schema>, SchemaError> {
        let cached = self.schemas.get(&id).map(|s| Arc::clone(s.value()));
        if let Some(schema) = cached {
            return Ok(schema);
        }

        let definition = self.registry.get_schema(id).await?;
        let parsed = Arc::new(self.codec.parse(&definition)?);
        let entry = self.schemas.entry(id).or_insert(parsed);
        tracing::debug!(schema_id = id, "schema cached");
        Ok(Arc::clone(entry.value()))
    }

    /// Decodes `payload` with the schema registered under `id`.
    pub async fn decode(&self, id: SchemaId, payload: &[u8]) -> Result<Record, SchemaError> {
        let schema = self.resolve(id).await?;
        self.codec.decode(&schema, payload)
    }

    /// Encodes `record` with the schema registered under `id`.
    pub async fn encode(&self, id: SchemaId, record: &Record) -> Result<Vec<u8>, SchemaError> {
        let schema = self.resolve(id).await?;
        self.codec.encode(&schema, record)
    }

    /// Validates and registers a definition, caching the parsed schema under the returned id.
    pub async fn register(&self, subject: &str, definition: &str) -> Result<SchemaId, SchemaError> {
        let parsed = Arc::new(self.codec.parse(definition)?);
        let id = self.registry.register_schema(subject, definition).await?;
        self.schemas.entry(id).or_insert(parsed);
        Ok(id)
    }

    /// True if `id` has been resolved before.
    pub fn contains(&self, id: SchemaId) -> bool {
        self.schemas.contains_key(&id)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub(crate) fn registry(&self) -> &Arc<dyn SchemaRegistry> {
        &self.registry
    }
}

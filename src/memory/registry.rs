//! # In-process schema registry.
//!
//! [`MemoryRegistry`] keeps definitions in a map. Ids are assigned from 1;
//! registering an identical `(subject, definition)` pair again returns the
//! existing id, mirroring how hosted registries deduplicate schemas.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SchemaError;
use crate::events::SchemaId;
use crate::ports::SchemaRegistry;

#[derive(Default)]
struct RegistryState {
    definitions: HashMap<SchemaId, String>,
    subjects: HashMap<(String, String), SchemaId>,
    next_id: SchemaId,
}

/// Map-backed [`SchemaRegistry`].
#[derive(Default)]
pub struct MemoryRegistry {
    state: RwLock<RegistryState>,
    lookups: AtomicUsize,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `definition` under an explicit id (replacing any previous one).
    pub async fn insert(&self, id: SchemaId, definition: impl Into<String>) {
        let mut state = self.state.write().await;
        state.definitions.insert(id, definition.into());
        state.next_id = state.next_id.max(id);
    }

    /// Number of `get_schema` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of stored definitions.
    pub async fn len(&self) -> usize {
        self.state.read().await.definitions.len()
    }

    /// True if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.definitions.is_empty()
    }
}

#[async_trait]
impl SchemaRegistry for MemoryRegistry {
    async fn register_schema(
        &self,
        subject: &str,
        definition: &str,
    ) -> Result<SchemaId, SchemaError> {
        let mut state = self.state.write().await;
        let key = (subject.to_string(), definition.to_string());
        if let Some(id) = state.subjects.get(&key) {
            return Ok(*id);
        }

        state.next_id = state
            .next_id
            .checked_add(1)
            .ok_or_else(|| SchemaError::Registry {
                error: "schema id space exhausted".into(),
            })?;
        let id = state.next_id;
        state.definitions.insert(id, definition.to_string());
        state.subjects.insert(key, id);
        Ok(id)
    }

    async fn get_schema(&self, id: SchemaId) -> Result<String, SchemaError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.state
            .read()
            .await
            .definitions
            .get(&id)
            .cloned()
            .ok_or(SchemaError::NotFound { id })
    }
}

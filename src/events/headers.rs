//! # Message headers and the broker's wire contract.
//!
//! Every published message carries two well-known headers:
//!
//! | key         | value                                       | when absent  |
//! |-------------|---------------------------------------------|--------------|
//! | `schemaId`  | 4-byte little-endian `i32`                  | `-1`         |
//! | `eventName` | UTF-8 event name                            | `"unknown"`  |
//!
//! Missing or malformed headers are tolerated; consumers fall back to the
//! defaults above instead of rejecting the message.

use bytes::Bytes;

/// Integer handle of a schema in the schema registry.
pub type SchemaId = i32;

/// Header key carrying the schema id.
pub const SCHEMA_ID_HEADER: &str = "schemaId";

/// Header key carrying the logical event name.
pub const EVENT_NAME_HEADER: &str = "eventName";

/// Schema id used when the `schemaId` header is missing or malformed.
pub const INVALID_SCHEMA_ID: SchemaId = -1;

/// Event name used when the `eventName` header is missing.
pub const UNKNOWN_EVENT_NAME: &str = "unknown";

/// Ordered multi-map of message headers.
///
/// Keys may repeat; lookups return the **last** value for a key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Bytes)>,
}

impl Headers {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the broker headers for an event.
    pub fn for_event(schema_id: SchemaId, name: &str) -> Self {
        let mut headers = Self::new();
        headers.insert(SCHEMA_ID_HEADER, Bytes::copy_from_slice(&schema_id.to_le_bytes()));
        headers.insert(EVENT_NAME_HEADER, Bytes::copy_from_slice(name.as_bytes()));
        headers
    }

    /// Appends a header (existing entries with the same key are kept).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Returns the last value stored under `key`.
    pub fn last(&self, key: &str) -> Option<&Bytes> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Schema id carried by the message, or [`INVALID_SCHEMA_ID`].
    pub fn schema_id(&self) -> SchemaId {
        self.last(SCHEMA_ID_HEADER)
            .and_then(|v| <[u8; 4]>::try_from(v.as_ref()).ok())
            .map(SchemaId::from_le_bytes)
            .unwrap_or(INVALID_SCHEMA_ID)
    }

    /// Event name carried by the message, or [`UNKNOWN_EVENT_NAME`].
    pub fn event_name(&self) -> String {
        self.last(EVENT_NAME_HEADER)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_else(|| UNKNOWN_EVENT_NAME.to_string())
    }

    /// Iterates over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_event_carries_id_and_name() {
        let headers = Headers::for_event(7, "OrderCreated");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.schema_id(), 7);
        assert_eq!(headers.event_name(), "OrderCreated");
        assert_eq!(
            headers.last(SCHEMA_ID_HEADER).map(|b| b.to_vec()),
            Some(vec![7, 0, 0, 0])
        );
    }

    #[test]
    fn test_missing_headers_fall_back() {
        let headers = Headers::new();
        assert_eq!(headers.schema_id(), INVALID_SCHEMA_ID);
        assert_eq!(headers.event_name(), UNKNOWN_EVENT_NAME);
    }

    #[test]
    fn test_wrong_width_schema_id_is_invalid() {
        let mut headers = Headers::new();
        headers.insert(SCHEMA_ID_HEADER, Bytes::from_static(&[1, 0]));
        assert_eq!(headers.schema_id(), INVALID_SCHEMA_ID);
    }

    #[test]
    fn test_last_value_wins() {
        let mut headers = Headers::for_event(1, "First");
        headers.insert(EVENT_NAME_HEADER, Bytes::from_static(b"Second"));
        headers.insert(SCHEMA_ID_HEADER, Bytes::copy_from_slice(&(-5i32).to_le_bytes()));
        assert_eq!(headers.event_name(), "Second");
        assert_eq!(headers.schema_id(), -5);
    }
}

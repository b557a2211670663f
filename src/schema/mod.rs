//! Schema resolution and payload codecs.
//!
//! - [`SchemaCache`] memoizes `schema id → parsed schema` in front of the registry.
//! - [`AvroCodec`] is the default [`Codec`](crate::Codec) (Avro binary datums).

mod avro;
mod cache;

pub use avro::AvroCodec;
pub use cache::SchemaCache;

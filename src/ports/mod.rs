//! Contracts the broker depends on.
//!
//! - [`Transport`] / [`TransportConsumer`]: keyed, headered byte messages with
//!   consumer-group load distribution.
//! - [`SchemaRegistry`]: schema definitions by id.
//! - [`Codec`]: the schema language (parse, decode, encode).

mod schema;
mod transport;

pub use schema::{Codec, SchemaRegistry};
pub use transport::{Message, Transport, TransportConsumer};

//! # eventlane
//!
//! **Eventlane** is an in-process event broker over a partitioned, log-based
//! message transport (Kafka-style topics, consumer groups and headers).
//!
//! Producers publish named, schema-versioned events without knowing about
//! partitions. Consumers subscribe handlers per topic without managing
//! connections; the broker runs the consumer-group workers, decodes payloads
//! through a schema cache and fans every record out to the subscribed
//! handlers under a global concurrency ceiling.
//!
//! ## Architecture
//! ```text
//!   publish(EventRecord)                          subscribe(topic, handler)
//!          │                                               │
//!          ▼                                               ▼
//! ┌──────────────────┐                  ┌──────────────────────────────────┐
//! │ Transport (port) │                  │ SubscriptionTable topic → {h}    │
//! │  send(key=id,    │                  │ first subscriber of a topic:     │
//! │   headers{       │                  │   ConsumerPool::start(topic)     │
//! │   schemaId,      │                  └────────────────┬─────────────────┘
//! │   eventName})    │                                   ▼
//! └────────┬─────────┘        ┌────────────────────────────────────────────┐
//!          │  topic log       │ ConsumerPool (group = "group-" + topic)     │
//!          └─────────────────►│  worker 1 … worker N  (recv → decode)       │
//!                             └───────────────┬────────────────────────────┘
//!                                             │ SchemaCache (id → schema)
//!                                             ▼
//!                                  ┌─────────────────────┐
//!                                  │ intake (bounded)    │
//!                                  └──────────┬──────────┘
//!                                             ▼
//!                                  ┌─────────────────────┐
//!                                  │ Dispatcher          │
//!                                  │ semaphore ceiling   │
//!                                  └──┬───────┬───────┬──┘
//!                                     ▼       ▼       ▼
//!                                  handler handler handler  → record status
//!                                                             Processed/Failed
//! ```
//!
//! ## Features
//! | Area          | Description                                             | Key types                                   |
//! |---------------|---------------------------------------------------------|---------------------------------------------|
//! | **Broker**    | Publish, subscribe, unsubscribe, graceful shutdown.     | [`Broker`], [`BrokerBuilder`]               |
//! | **Handlers**  | Async callbacks, closures, per-event-name routing.      | [`Handler`], [`HandlerFn`], [`EventHandlerRouter`] |
//! | **Events**    | Records with status and the header wire contract.       | [`EventRecord`], [`EventStatus`], [`Headers`] |
//! | **Ports**     | Transport and schema registry contracts, codecs.        | [`Transport`], [`SchemaRegistry`], [`Codec`] |
//! | **Schemas**   | Cached schema resolution, Avro binary codec.            | [`SchemaCache`], [`AvroCodec`]              |
//! | **Policies**  | Backoff after transport errors.                         | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Errors**    | Typed errors with stable log labels.                    | [`TransportError`], [`SchemaError`], [`HandlerError`], [`BrokerError`] |
//! | **In-memory** | Ports for tests and single-process use.                 | [`memory::MemoryTransport`], [`memory::MemoryRegistry`] |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventlane::{Broker, BrokerConfig, EventHandlerRouter, EventRecord, HandlerError, HandlerFn};
//! use eventlane::memory::{MemoryRegistry, MemoryTransport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = BrokerConfig {
//!         workers_per_topic: 2,
//!         ..BrokerConfig::default()
//!     };
//!     let broker = Broker::builder(
//!         Arc::new(MemoryTransport::new()),
//!         Arc::new(MemoryRegistry::new()),
//!     )
//!     .with_config(cfg)
//!     .build();
//!
//!     let router = EventHandlerRouter::new().with_handler(HandlerFn::arc(
//!         "OrderCreated",
//!         |record: Arc<EventRecord>| async move {
//!             let id = record.field("id").ok_or(HandlerError::MissingField {
//!                 field: "id".into(),
//!             })?;
//!             println!("order created: {id}");
//!             Ok::<_, HandlerError>(())
//!         },
//!     ));
//!     broker.subscribe("orders", Arc::new(router));
//!
//!     let schema_id = broker
//!         .register_schema(
//!             "orders-value",
//!             r#"{"type":"record","name":"OrderCreated","fields":[{"name":"id","type":"int"}]}"#,
//!         )
//!         .await?;
//!     let record = broker
//!         .encode("orders", "OrderCreated", schema_id, &json!({ "id": 1 }))
//!         .await?;
//!     broker.publish(&record).await;
//!
//!     broker.shutdown().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod handlers;
mod policies;
mod ports;
mod schema;

pub mod memory;

// ---- Public re-exports ----

pub use core::{Broker, BrokerBuilder, BrokerConfig};
pub use error::{BrokerError, HandlerError, SchemaError, TransportError};
pub use events::{
    EVENT_NAME_HEADER, EventRecord, EventStatus, Headers, INVALID_SCHEMA_ID, Record,
    SCHEMA_ID_HEADER, SchemaId, UNKNOWN_EVENT_NAME,
};
pub use handlers::{EventHandlerRouter, Handler, HandlerFn, HandlerRef, ROUTER_EVENT_NAME};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use ports::{Codec, Message, SchemaRegistry, Transport, TransportConsumer};
pub use schema::{AvroCodec, SchemaCache};

//! # Event handler trait.
//!
//! Provides [`Handler`], the callback contract shared by the broker and the
//! [`EventHandlerRouter`](crate::EventHandlerRouter).
//!
//! ## Rules
//! - Handlers run as independent tasks; many may run at once, up to the
//!   broker's concurrency ceiling.
//! - An `Err` (or a panic) marks the record `Failed` and is logged; it never
//!   reaches other handlers, the dispatch loop or the consumer workers.
//! - The broker identifies a subscription by the `Arc` allocation, not by
//!   [`Handler::event_name`]: subscribing the same `HandlerRef` twice is a no-op,
//!   while two separate instances are two subscriptions.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use eventlane::{EventRecord, Handler, HandlerError};
//!
//! struct OrderCreated;
//!
//! #[async_trait]
//! impl Handler for OrderCreated {
//!     fn event_name(&self) -> &str { "OrderCreated" }
//!
//!     async fn handle(&self, record: Arc<EventRecord>) -> Result<(), HandlerError> {
//!         let id = record
//!             .field("id")
//!             .and_then(|v| v.as_i64())
//!             .ok_or(HandlerError::MissingField { field: "id".into() })?;
//!         let _ = id;
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::EventRecord;

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// Callback invoked with each decoded event.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Logical event name this handler processes (routing key for the router).
    fn event_name(&self) -> &str;

    /// Processes one record.
    async fn handle(&self, record: Arc<EventRecord>) -> Result<(), HandlerError>;
}

/// Identity of a handler allocation, used to deduplicate subscriptions.
pub(crate) fn handler_key(handler: &HandlerRef) -> usize {
    Arc::as_ptr(handler) as *const () as usize
}

//! # EventHandlerRouter: one handler per event name.
//!
//! The router is itself a [`Handler`], so a single router subscribed to a topic
//! fronts every event name flowing through that topic.
//!
//! ```text
//! Broker ──► router.handle(record)
//!              ├─ "OrderCreated"   ──► OrderCreatedHandler
//!              ├─ "OrderCommented" ──► CommentHandler
//!              └─ anything else    ──► debug log, Ok(())
//! ```
//!
//! ## Rules
//! - Registering a second handler for the same name replaces the first.
//! - Unmatched events are not an error.
//! - The routed handler's result is returned unchanged, so the broker marks
//!   the record according to the handler that actually ran.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::HandlerError;
use crate::events::EventRecord;
use crate::handlers::handler::{Handler, HandlerRef};

/// Event name the router reports through [`Handler::event_name`].
pub const ROUTER_EVENT_NAME: &str = "*";

/// Maps event names to handlers.
#[derive(Default)]
pub struct EventHandlerRouter {
    handlers: DashMap<String, HandlerRef>,
}

impl EventHandlerRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its [`Handler::event_name`].
    ///
    /// Returns the handler previously registered for that name, if any.
    pub fn register_handler(&self, handler: HandlerRef) -> Option<HandlerRef> {
        let name = handler.event_name().to_string();
        let previous = self.handlers.insert(name.clone(), handler);
        if previous.is_some() {
            tracing::debug!(event = %name, "router handler replaced");
        }
        previous
    }

    /// Builder-style [`register_handler`](Self::register_handler).
    #[must_use]
    pub fn with_handler(self, handler: HandlerRef) -> Self {
        self.register_handler(handler);
        self
    }

    /// Handler registered for `event_name`.
    pub fn handler(&self, event_name: &str) -> Option<HandlerRef> {
        self.handlers.get(event_name).map(|h| Arc::clone(h.value()))
    }

    /// Sorted list of registered event names.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invokes the handler registered for `record.name()`.
    pub async fn route(&self, record: Arc<EventRecord>) -> Result<(), HandlerError> {
        match self.handler(record.name()) {
            Some(handler) => handler.handle(record).await,
            None => {
                tracing::debug!(
                    topic = record.topic(),
                    event = record.name(),
                    "no handler registered for event"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Handler for EventHandlerRouter {
    fn event_name(&self) -> &str {
        ROUTER_EVENT_NAME
    }

    async fn handle(&self, record: Arc<EventRecord>) -> Result<(), HandlerError> {
        self.route(record).await
    }
}

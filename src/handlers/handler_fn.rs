//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Arc<EventRecord>) -> Fut`, producing a
//! fresh future per invocation. Shared state belongs in an explicit `Arc<...>`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventlane::{EventRecord, Handler, HandlerFn, HandlerRef, HandlerError};
//!
//! let h: HandlerRef = HandlerFn::arc("OrderCreated", |record: Arc<EventRecord>| async move {
//!     let _ = record.field("id");
//!     Ok::<_, HandlerError>(())
//! });
//!
//! assert_eq!(h.event_name(), "OrderCreated");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::EventRecord;
use crate::handlers::handler::Handler;

/// Function-backed handler implementation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler for `event_name`.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(event_name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: event_name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(event_name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(event_name, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<EventRecord>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn event_name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, record: Arc<EventRecord>) -> Result<(), HandlerError> {
        (self.f)(record).await
    }
}

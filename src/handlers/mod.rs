//! # Event handlers.
//!
//! - [`Handler`] the async callback contract (`event_name` + `handle`)
//! - [`HandlerFn`] closure-backed handler
//! - [`EventHandlerRouter`] routes records to one handler per event name and is
//!   itself a [`Handler`]

mod handler;
mod handler_fn;
mod router;

pub(crate) use handler::handler_key;
pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
pub use router::{EventHandlerRouter, ROUTER_EVENT_NAME};

//! Retry timing for consumer workers.
//!
//! ## Contents
//! - [`BackoffPolicy`] pause schedule after consecutive transport errors
//! - [`JitterPolicy`]  randomization so workers do not retry in lockstep
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=10s, jitter=Equal.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;

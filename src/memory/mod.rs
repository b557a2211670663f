//! In-process implementations of the ports.
//!
//! Useful for tests, demos and single-process deployments:
//! - [`MemoryTransport`]: per-topic logs with consumer-group offsets.
//! - [`MemoryRegistry`]: map-backed schema registry.

mod registry;
mod transport;

pub use registry::MemoryRegistry;
pub use transport::MemoryTransport;

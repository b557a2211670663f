//! Broker runtime: subscriptions, consumer pools, dispatch and lifecycle.
//!
//! The public API from this module is [`Broker`], its [`BrokerBuilder`] and
//! [`BrokerConfig`].
//!
//! Internal modules:
//! - [`subscriptions`]: thread-safe `topic → {handler}` table;
//! - [`pool`]: per-topic consumer-group workers (receive, decode, enqueue);
//! - [`dispatch`]: bounded fan-out of decoded records to handlers;
//! - [`shutdown`]: cross-platform termination signal handling.

mod broker;
mod builder;
mod config;
mod dispatch;
mod pool;
mod shutdown;
mod subscriptions;

pub use broker::Broker;
pub use builder::BrokerBuilder;
pub use config::BrokerConfig;

//! # Broker configuration.
//!
//! Provides [`BrokerConfig`], the runtime settings of a [`Broker`](crate::Broker).
//!
//! ## Sentinel values
//! - `workers_per_topic = 0` → auto: `max(1, hardware_concurrency / 2)`
//! - `max_concurrent_handlers = 0` → auto: `2 × hardware_concurrency`
//! - `intake_capacity` is clamped to a minimum of 1

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Runtime settings for the broker.
///
/// All fields are public. Prefer the accessor methods over reading the
/// sentinel-bearing fields directly.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Parallel consumer workers started per subscribed topic (`0` = auto).
    ///
    /// All workers of a topic join the same consumer group.
    pub workers_per_topic: usize,

    /// Ceiling on handler invocations running at once, across all topics (`0` = auto).
    pub max_concurrent_handlers: usize,

    /// Capacity of the queue between consumer workers and dispatch.
    ///
    /// Workers suspend when it is full.
    pub intake_capacity: usize,

    /// Prefix of consumer group ids; the group for a topic is `prefix + topic`.
    pub group_prefix: String,

    /// Pause schedule after consecutive transport errors in a worker.
    pub reconnect_backoff: BackoffPolicy,

    /// How long `shutdown` waits for in-flight handler invocations.
    pub grace: Duration,

    /// Upper bound for the outbound flush performed during `shutdown`.
    pub flush_timeout: Duration,
}

impl BrokerConfig {
    /// Number of consumer workers per topic.
    pub fn worker_count(&self) -> usize {
        match self.workers_per_topic {
            0 => (hardware_concurrency() / 2).max(1),
            n => n,
        }
    }

    /// Global handler concurrency ceiling.
    pub fn handler_limit(&self) -> usize {
        match self.max_concurrent_handlers {
            0 => hardware_concurrency() * 2,
            n => n,
        }
    }

    /// Intake capacity clamped to a minimum of 1.
    #[inline]
    pub fn intake_capacity_clamped(&self) -> usize {
        self.intake_capacity.max(1)
    }

    /// Consumer group id for `topic`.
    pub fn group_for(&self, topic: &str) -> String {
        format!("{}{}", self.group_prefix, topic)
    }
}

impl Default for BrokerConfig {
    /// Default configuration:
    ///
    /// - `workers_per_topic = 0` (auto)
    /// - `max_concurrent_handlers = 0` (auto)
    /// - `intake_capacity = 1024`
    /// - `group_prefix = "group-"`
    /// - `reconnect_backoff = BackoffPolicy::default()`
    /// - `grace = 30s`
    /// - `flush_timeout = 5s`
    fn default() -> Self {
        Self {
            workers_per_topic: 0,
            max_concurrent_handlers: 0,
            intake_capacity: 1024,
            group_prefix: "group-".to_string(),
            reconnect_backoff: BackoffPolicy::default(),
            grace: Duration::from_secs(30),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

fn hardware_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

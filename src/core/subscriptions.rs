//! # Subscription table: topic → set of handlers.
//!
//! Handlers are keyed by allocation identity ([`handler_key`]), so the same
//! `HandlerRef` registered twice is stored once, and `remove` takes out exactly
//! that allocation.
//!
//! ## Rules
//! - Outer and inner maps are sharded ([`DashMap`]); writers lock one shard,
//!   never the whole table.
//! - Dispatch works on a [`handlers`](SubscriptionTable::handlers) snapshot, so
//!   (un)subscribing while a record is being fanned out affects only later records.
//! - A topic entry is kept after its last handler leaves.

use std::sync::Arc;

use dashmap::DashMap;

use crate::handlers::{HandlerRef, handler_key};

type HandlerSet = DashMap<usize, HandlerRef>;

/// Thread-safe `topic → {handler}` table.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    topics: DashMap<String, Arc<HandlerSet>>,
}

impl SubscriptionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` to `topic`. Returns `false` if it was already present.
    pub(crate) fn add(&self, topic: &str, handler: HandlerRef) -> bool {
        let set = self.set(topic);
        set.insert(handler_key(&handler), handler).is_none()
    }

    /// Removes `handler` from `topic`. Returns `false` if it was not present.
    pub(crate) fn remove(&self, topic: &str, handler: &HandlerRef) -> bool {
        let set = self.topics.get(topic).map(|s| Arc::clone(s.value()));
        set.is_some_and(|s| s.remove(&handler_key(handler)).is_some())
    }

    /// Snapshot of the handlers currently subscribed to `topic`.
    pub(crate) fn handlers(&self, topic: &str) -> Vec<HandlerRef> {
        let set = self.topics.get(topic).map(|s| Arc::clone(s.value()));
        set.map(|s| s.iter().map(|e| Arc::clone(e.value())).collect())
            .unwrap_or_default()
    }

    /// Number of handlers subscribed to `topic`.
    pub(crate) fn count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |s| s.len())
    }

    fn set(&self, topic: &str) -> Arc<HandlerSet> {
        if let Some(set) = self.topics.get(topic) {
            return Arc::clone(set.value());
        }
        Arc::clone(self.topics.entry(topic.to_string()).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::events::EventRecord;
    use crate::handlers::HandlerFn;

    fn noop(name: &'static str) -> HandlerRef {
        HandlerFn::arc(name, |_record: Arc<EventRecord>| async { Ok::<_, HandlerError>(()) })
    }

    #[test]
    fn test_same_handler_is_deduplicated() {
        let table = SubscriptionTable::new();
        let h = noop("A");

        assert!(table.add("orders", Arc::clone(&h)));
        assert!(!table.add("orders", Arc::clone(&h)));
        assert_eq!(table.count("orders"), 1);
    }

    #[test]
    fn test_distinct_instances_with_same_name_are_distinct() {
        let table = SubscriptionTable::new();
        assert!(table.add("orders", noop("A")));
        assert!(table.add("orders", noop("A")));
        assert_eq!(table.count("orders"), 2);
    }

    #[test]
    fn test_remove_targets_only_that_handler() {
        let table = SubscriptionTable::new();
        let a = noop("A");
        let b = noop("B");
        table.add("orders", Arc::clone(&a));
        table.add("orders", Arc::clone(&b));
        table.add("payments", Arc::clone(&a));

        assert!(table.remove("orders", &a));
        assert!(!table.remove("orders", &a));

        let left = table.handlers("orders");
        assert_eq!(left.len(), 1);
        assert!(Arc::ptr_eq(&left[0], &b));
        assert_eq!(table.count("payments"), 1);
    }

    #[test]
    fn test_unknown_topic_is_empty() {
        let table = SubscriptionTable::new();
        assert!(table.handlers("nope").is_empty());
        assert!(!table.remove("nope", &noop("A")));
        assert_eq!(table.count("nope"), 0);
    }
}

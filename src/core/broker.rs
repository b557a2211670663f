//! # Broker: publish/subscribe façade over the transport and schema ports.
//!
//! The [`Broker`] owns the subscription table, the consumer pools (one per
//! subscribed topic), the schema cache and the dispatch loop. It is built with
//! [`Broker::builder`] and shared as `Arc<Broker>`.
//!
//! ## High-level architecture
//! ```text
//! publish(record) ──► transport.send(topic, key = record.id, payload, headers)
//!
//! subscribe(topic, handler)
//!   ├─► SubscriptionTable.add(topic, handler)
//!   └─► first time for topic: ConsumerPool::start(topic, "group-" + topic, n)
//!
//! ConsumerPool workers ──► decode (SchemaCache) ──► [intake] ──► Dispatcher
//!                                                                   │
//!                                          handlers(topic) snapshot ┘
//!                                          └─► handler.handle(record) (bounded)
//!
//! shutdown()
//!   ├─► runtime_token.cancel()        → pools and dispatch loop stop
//!   ├─► join pools, join dispatch loop
//!   ├─► wait in-flight handlers (up to cfg.grace)
//!   ├─► transport.flush(cfg.flush_timeout)
//!   └─► transport.close(), registry.close()
//! ```
//!
//! ## Rules
//! - `publish`, `subscribe`, `unsubscribe` and `shutdown` never return errors;
//!   failures are logged.
//! - At most one pool per topic; pools are not stopped by `unsubscribe`.
//! - `shutdown` is idempotent. After it, `subscribe` registers nothing.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventlane::{Broker, EventRecord, HandlerError, HandlerFn};
//! use eventlane::memory::{MemoryRegistry, MemoryTransport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Broker::builder(
//!         Arc::new(MemoryTransport::new()),
//!         Arc::new(MemoryRegistry::new()),
//!     )
//!     .build();
//!
//!     let schema_id = broker
//!         .register_schema(
//!             "orders-value",
//!             r#"{"type":"record","name":"OrderCreated","fields":[{"name":"id","type":"int"}]}"#,
//!         )
//!         .await?;
//!
//!     broker.subscribe(
//!         "orders",
//!         HandlerFn::arc("OrderCreated", |record: Arc<EventRecord>| async move {
//!             println!("order {:?}", record.field("id"));
//!             Ok::<_, HandlerError>(())
//!         }),
//!     );
//!
//!     let record = broker
//!         .encode("orders", "OrderCreated", schema_id, &json!({ "id": 1 }))
//!         .await?;
//!     assert!(broker.publish(&record).await);
//!
//!     broker.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::builder::BrokerBuilder;
use crate::core::config::BrokerConfig;
use crate::core::pool::{ConsumerPool, PoolContext};
use crate::core::shutdown;
use crate::core::subscriptions::SubscriptionTable;
use crate::error::BrokerError;
use crate::events::{EventRecord, Headers, Record, SchemaId};
use crate::handlers::HandlerRef;
use crate::ports::{Codec, SchemaRegistry, Transport};
use crate::schema::{AvroCodec, SchemaCache};

/// In-process event broker over a partitioned log transport.
pub struct Broker<C: Codec = AvroCodec> {
    cfg: BrokerConfig,
    ctx: PoolContext<C>,
    subscriptions: Arc<SubscriptionTable>,
    pools: DashMap<String, ConsumerPool>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    in_flight: TaskTracker,
    runtime_token: CancellationToken,
    closed: AtomicBool,
}

impl Broker {
    /// Starts building a broker with the default [`AvroCodec`].
    pub fn builder(
        transport: Arc<dyn Transport>,
        registry: Arc<dyn SchemaRegistry>,
    ) -> BrokerBuilder<AvroCodec> {
        BrokerBuilder::new(transport, registry)
    }
}

impl<C: Codec> Broker<C> {
    pub(crate) fn new_internal(
        cfg: BrokerConfig,
        ctx: PoolContext<C>,
        subscriptions: Arc<SubscriptionTable>,
        dispatch: JoinHandle<()>,
        in_flight: TaskTracker,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            ctx,
            subscriptions,
            pools: DashMap::new(),
            dispatch: Mutex::new(Some(dispatch)),
            in_flight,
            runtime_token,
            closed: AtomicBool::new(false),
        }
    }

    /// Sends `record` to its topic.
    ///
    /// The record id is the partition key; schema id and name travel as
    /// headers. Returns `true` once the transport accepted the message and
    /// `false` on any submission error (logged, never raised).
    pub async fn publish(&self, record: &EventRecord) -> bool {
        let key = record.id().to_string();
        let headers = Headers::for_event(record.schema_id(), record.name());
        let res = self
            .ctx
            .transport
            .send(record.topic(), &key, record.payload().clone(), headers)
            .await;

        match res {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    topic = record.topic(),
                    event = record.name(),
                    schema_id = record.schema_id(),
                    label = e.as_label(),
                    error = %e,
                    "publish failed"
                );
                false
            }
        }
    }

    /// Adds `handler` to `topic`, starting the topic's consumer pool on first use.
    ///
    /// Safe to call concurrently; exactly one pool is started per topic.
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, topic: &str, handler: HandlerRef) {
        if self.is_shut_down() {
            tracing::warn!(topic, handler = handler.event_name(), "subscribe after shutdown ignored");
            return;
        }

        if !self.subscriptions.add(topic, handler) {
            tracing::debug!(topic, "handler already subscribed");
        }

        self.pools.entry(topic.to_string()).or_insert_with(|| {
            ConsumerPool::start(
                topic,
                &self.cfg.group_for(topic),
                self.cfg.worker_count(),
                &self.ctx,
                &self.runtime_token,
            )
        });
    }

    /// Removes `handler` from `topic`. Returns `false` if it was not subscribed.
    ///
    /// The topic's consumer pool keeps running; its records reach the
    /// remaining handlers (or none).
    pub fn unsubscribe(&self, topic: &str, handler: &HandlerRef) -> bool {
        let removed = self.subscriptions.remove(topic, handler);
        if !removed {
            tracing::debug!(topic, handler = handler.event_name(), "unsubscribe: handler not found");
        }
        removed
    }

    /// Stops consumption and dispatch, then releases the ports.
    ///
    /// Handlers already running get up to [`BrokerConfig::grace`] to finish.
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(pools = self.pools.len(), "broker shutting down");
        self.runtime_token.cancel();

        let pools: Vec<ConsumerPool> = self.pools.iter().map(|p| p.value().clone()).collect();
        for pool in &pools {
            pool.join().await;
        }

        let dispatch = self.dispatch.lock().await.take();
        if let Some(handle) = dispatch {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "dispatch loop terminated abnormally");
            }
        }

        self.in_flight.close();
        let grace = self.cfg.grace;
        if tokio::time::timeout(grace, self.in_flight.wait()).await.is_err() {
            tracing::warn!(
                ?grace,
                stuck = self.in_flight.len(),
                "handlers still running after grace period"
            );
        }

        let flush_timeout = self.cfg.flush_timeout;
        match tokio::time::timeout(flush_timeout, self.ctx.transport.flush(flush_timeout)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(label = e.as_label(), error = %e, "flush failed during shutdown");
            }
            Err(_elapsed) => {
                tracing::warn!(?flush_timeout, "flush timed out during shutdown");
            }
        }

        self.ctx.transport.close().await;
        self.ctx.schemas.registry().close().await;
        tracing::debug!("broker stopped");
    }

    /// Waits for a termination signal, then runs [`shutdown`](Self::shutdown).
    ///
    /// Returns `Err` only if signal registration fails.
    pub async fn run_until_signal(&self) -> std::io::Result<()> {
        shutdown::wait_for_shutdown_signal().await?;
        self.shutdown().await;
        Ok(())
    }

    /// Registers a schema definition and caches its parsed form.
    pub async fn register_schema(
        &self,
        subject: &str,
        definition: &str,
    ) -> Result<SchemaId, BrokerError> {
        if self.is_shut_down() {
            return Err(BrokerError::ShutDown);
        }
        Ok(self.ctx.schemas.register(subject, definition).await?)
    }

    /// Encodes `value` with schema `schema_id` into a publishable record.
    ///
    /// The returned record carries only the encoded payload; `decoded` is
    /// filled on the consuming side.
    pub async fn encode(
        &self,
        topic: &str,
        name: &str,
        schema_id: SchemaId,
        value: &Record,
    ) -> Result<EventRecord, BrokerError> {
        if self.is_shut_down() {
            return Err(BrokerError::ShutDown);
        }
        let payload = self.ctx.schemas.encode(schema_id, value).await?;
        Ok(EventRecord::new(topic, name, payload, schema_id))
    }

    /// True if a consumer pool has been started for `topic`.
    pub fn has_pool(&self, topic: &str) -> bool {
        self.pools.contains_key(topic)
    }

    /// Number of started consumer pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Number of handlers currently subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions.count(topic)
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The schema cache shared by producers and consumer workers.
    pub fn schema_cache(&self) -> &SchemaCache<C> {
        &self.ctx.schemas
    }

    /// Effective configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.cfg
    }
}

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{
    broker::Broker, config::BrokerConfig, dispatch::Dispatcher, pool::PoolContext,
    subscriptions::SubscriptionTable,
};
use crate::{
    ports::{Codec, SchemaRegistry, Transport},
    schema::SchemaCache,
};

/// Builder for constructing a [`Broker`] with optional settings.
pub struct BrokerBuilder<C: Codec> {
    transport: Arc<dyn Transport>,
    registry: Arc<dyn SchemaRegistry>,
    cfg: BrokerConfig,
    codec: C,
}

impl BrokerBuilder<crate::schema::AvroCodec> {
    /// Creates a builder with the default configuration and the Avro codec.
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            transport,
            registry,
            cfg: BrokerConfig::default(),
            codec: crate::schema::AvroCodec::new(),
        }
    }
}

impl<C: Codec> BrokerBuilder<C> {
    /// Replaces the runtime configuration.
    pub fn with_config(mut self, cfg: BrokerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the schema codec.
    pub fn with_codec<C2: Codec>(self, codec: C2) -> BrokerBuilder<C2> {
        BrokerBuilder {
            transport: self.transport,
            registry: self.registry,
            cfg: self.cfg,
            codec,
        }
    }

    /// Builds the broker and starts its dispatch loop.
    ///
    /// Consumer pools start lazily on the first subscription of each topic.
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Broker<C>> {
        let runtime_token = CancellationToken::new();
        let in_flight = TaskTracker::new();
        let subscriptions = Arc::new(SubscriptionTable::new());
        let (tx, rx) = mpsc::channel(self.cfg.intake_capacity_clamped());

        let dispatch = Dispatcher::new(
            Arc::clone(&subscriptions),
            self.cfg.handler_limit(),
            in_flight.clone(),
        )
        .spawn(rx, runtime_token.clone());

        let ctx = PoolContext {
            transport: self.transport,
            schemas: Arc::new(SchemaCache::new(self.registry, self.codec)),
            intake: tx,
            backoff: self.cfg.reconnect_backoff,
        };

        Arc::new(Broker::new_internal(
            self.cfg,
            ctx,
            subscriptions,
            dispatch,
            in_flight,
            runtime_token,
        ))
    }
}

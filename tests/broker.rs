use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eventlane::memory::{MemoryRegistry, MemoryTransport};
use eventlane::{
    Broker, BrokerConfig, EventHandlerRouter, EventRecord, EventStatus, HandlerError, HandlerFn,
    HandlerRef, Headers, Record, SchemaError, SchemaId, SchemaRegistry, Transport,
    TransportConsumer, TransportError,
};
use serde_json::json;
use tokio::sync::mpsc;

const ORDER_CREATED: &str = r#"{
    "type": "record",
    "name": "OrderCreated",
    "fields": [
        { "name": "id", "type": "int" },
        { "name": "description", "type": ["null", "string"], "default": null }
    ]
}"#;

fn config(workers: usize, handlers: usize) -> BrokerConfig {
    BrokerConfig {
        workers_per_topic: workers,
        max_concurrent_handlers: handlers,
        grace: Duration::from_secs(2),
        ..BrokerConfig::default()
    }
}

async fn setup(cfg: BrokerConfig) -> (Arc<Broker>, MemoryTransport, Arc<MemoryRegistry>) {
    let transport = MemoryTransport::new();
    let registry = Arc::new(MemoryRegistry::new());
    registry.insert(7, ORDER_CREATED).await;
    let broker = Broker::builder(Arc::new(transport.clone()), registry.clone())
        .with_config(cfg)
        .build();
    (broker, transport, registry)
}

/// Handler that hands every record it sees to the test before finishing.
fn capture(
    name: &'static str,
    fail: bool,
) -> (HandlerRef, mpsc::UnboundedReceiver<Arc<EventRecord>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: HandlerRef = HandlerFn::arc(name, move |record: Arc<EventRecord>| {
        let _ = tx.send(Arc::clone(&record));
        async move {
            if fail {
                Err(HandlerError::fail("rejected"))
            } else {
                Ok(())
            }
        }
    });
    (handler, rx)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Arc<EventRecord>>) -> Arc<EventRecord> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("handler should be invoked")
        .expect("handler alive")
}

async fn settled(record: &EventRecord) -> EventStatus {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match record.status() {
                EventStatus::New => tokio::time::sleep(Duration::from_millis(5)).await,
                status => return status,
            }
        }
    })
    .await
    .expect("record should settle")
}

async fn publish(broker: &Broker, topic: &str, name: &str, value: Record) {
    let record = broker.encode(topic, name, 7, &value).await.unwrap();
    assert!(broker.publish(&record).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_order_created_reaches_routed_handler_decoded() {
    let (broker, _transport, _registry) = setup(config(2, 4)).await;
    let (handler, mut seen) = capture("OrderCreated", false);
    let router = EventHandlerRouter::new().with_handler(handler);
    broker.subscribe("orders", Arc::new(router));

    publish(&broker, "orders", "OrderCreated", json!({ "id": 1, "description": null })).await;

    let record = next(&mut seen).await;
    assert_eq!(record.name(), "OrderCreated");
    assert_eq!(record.schema_id(), 7);
    assert_eq!(record.field("id"), Some(&json!(1)));
    assert_eq!(record.field("description"), Some(&json!(null)));
    assert_eq!(settled(&record).await, EventStatus::Processed);

    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failing_handler_does_not_affect_other_events() {
    let (broker, _transport, _registry) = setup(config(2, 4)).await;
    let (bad, mut bad_seen) = capture("OrderRejected", true);
    let (good, mut good_seen) = capture("OrderCreated", false);
    let router = EventHandlerRouter::new().with_handler(bad).with_handler(good);
    broker.subscribe("orders", Arc::new(router));

    publish(&broker, "orders", "OrderRejected", json!({ "id": 1, "description": "x" })).await;
    publish(&broker, "orders", "OrderCreated", json!({ "id": 2, "description": null })).await;

    let rejected = next(&mut bad_seen).await;
    let created = next(&mut good_seen).await;
    assert_eq!(settled(&rejected).await, EventStatus::Failed);
    assert_eq!(settled(&created).await, EventStatus::Processed);

    publish(&broker, "orders", "OrderCreated", json!({ "id": 3, "description": null })).await;
    let later = next(&mut good_seen).await;
    assert_eq!(settled(&later).await, EventStatus::Processed);

    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unsubscribed_topic_keeps_consuming_without_handlers() {
    let (broker, transport, _registry) = setup(config(1, 4)).await;
    let (handler, mut seen) = capture("OrderCreated", false);
    broker.subscribe("orders", Arc::clone(&handler));
    assert!(broker.unsubscribe("orders", &handler));

    publish(&broker, "orders", "OrderCreated", json!({ "id": 1, "description": null })).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.committed("orders", "group-orders").await < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("message should still be consumed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(seen.try_recv().is_err());
    assert!(broker.has_pool("orders"));
    assert_eq!(broker.subscriber_count("orders"), 0);
    broker.shutdown().await;
}

struct RejectingTransport {
    attempts: AtomicUsize,
}

#[async_trait]
impl Transport for RejectingTransport {
    async fn send(
        &self,
        topic: &str,
        _key: &str,
        _payload: Bytes,
        _headers: Headers,
    ) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Send {
            topic: topic.to_string(),
            error: "queue full".into(),
        })
    }

    async fn subscribe(
        &self,
        _topic: &str,
        _group: &str,
    ) -> Result<Box<dyn TransportConsumer>, TransportError> {
        Err(TransportError::Closed)
    }
}

#[tokio::test]
async fn test_publish_reports_submission_failure() {
    let transport = Arc::new(RejectingTransport {
        attempts: AtomicUsize::new(0),
    });
    let broker = Broker::builder(transport.clone(), Arc::new(MemoryRegistry::new()))
        .with_config(config(1, 1))
        .build();

    let record = EventRecord::new("orders", "OrderCreated", vec![2u8, 0], 7);
    assert!(!broker.publish(&record).await);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(record.status(), EventStatus::New);
    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_starts_one_pool() {
    let (broker, transport, _registry) = setup(config(2, 8)).await;
    let hits = Arc::new(AtomicUsize::new(0));

    let mut joins = Vec::new();
    for _ in 0..16 {
        let broker = Arc::clone(&broker);
        let hits = Arc::clone(&hits);
        joins.push(tokio::spawn(async move {
            broker.subscribe(
                "orders",
                HandlerFn::arc("OrderCreated", move |_record: Arc<EventRecord>| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, HandlerError>(())
                    }
                }),
            );
        }));
    }
    for join in joins {
        join.await.unwrap();
    }
    assert_eq!(broker.pool_count(), 1);
    assert_eq!(broker.subscriber_count("orders"), 16);

    publish(&broker, "orders", "OrderCreated", json!({ "id": 1, "description": null })).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while hits.load(Ordering::SeqCst) < 16 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every subscriber should see the message");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 16);
    assert_eq!(transport.committed("orders", "group-orders").await, 1);
    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handler_ceiling_holds_across_topics() {
    let (broker, _transport, _registry) = setup(config(2, 2)).await;
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    for topic in ["orders", "payments", "shipments"] {
        let (running, peak, done) = (running.clone(), peak.clone(), done.clone());
        broker.subscribe(
            topic,
            HandlerFn::arc("OrderCreated", move |_record: Arc<EventRecord>| {
                let (running, peak, done) = (running.clone(), peak.clone(), done.clone());
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(())
                }
            }),
        );
    }

    for id in 0..5 {
        for topic in ["orders", "payments", "shipments"] {
            publish(&broker, topic, "OrderCreated", json!({ "id": id, "description": null })).await;
        }
    }

    tokio::time::timeout(Duration::from_secs(10), async {
        while done.load(Ordering::SeqCst) < 15 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every record should be handled");

    assert!(peak.load(Ordering::SeqCst) <= 2);
    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_schema_fetched_once_for_many_messages() {
    let transport = MemoryTransport::new();
    let registry = Arc::new(MemoryRegistry::new());
    registry.insert(7, ORDER_CREATED).await;
    let broker = Broker::builder(Arc::new(transport.clone()), registry.clone())
        .with_config(config(1, 4))
        .build();
    let (handler, mut seen) = capture("OrderCreated", false);
    broker.subscribe("orders", handler);

    // Produce with an independent cache so the broker's cache starts cold.
    let producer = Broker::builder(Arc::new(transport.clone()), registry.clone()).build();
    for id in 0..10 {
        let record = producer
            .encode("orders", "OrderCreated", 7, &json!({ "id": id, "description": null }))
            .await
            .unwrap();
        assert!(producer.publish(&record).await);
    }

    for _ in 0..10 {
        next(&mut seen).await;
    }
    assert_eq!(registry.lookups(), 2);
    assert!(broker.schema_cache().contains(7));
    assert_eq!(broker.schema_cache().len(), 1);
    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_is_idempotent() {
    let (broker, transport, _registry) = setup(config(2, 4)).await;
    let (handler, _seen) = capture("OrderCreated", false);
    broker.subscribe("orders", handler);

    broker.shutdown().await;
    broker.shutdown().await;
    let again = Arc::clone(&broker);
    tokio::spawn(async move { again.shutdown().await })
        .await
        .unwrap();

    assert!(broker.is_shut_down());
    assert!(transport.is_closed());
    let record = EventRecord::new("orders", "OrderCreated", vec![2u8, 0], 7);
    assert!(!broker.publish(&record).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_message_without_headers_uses_defaults_and_is_dropped() {
    let (broker, transport, _registry) = setup(config(1, 4)).await;
    let (handler, mut seen) = capture("OrderCreated", false);
    broker.subscribe("orders", handler);

    transport
        .send("orders", "k", Bytes::from_static(&[2, 0]), Headers::new())
        .await
        .unwrap();
    publish(&broker, "orders", "OrderCreated", json!({ "id": 9, "description": null })).await;

    let record = next(&mut seen).await;
    assert_eq!(record.field("id"), Some(&json!(9)));
    assert!(seen.try_recv().is_err());
    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unsubscribe_excludes_only_that_handler() {
    let (broker, _transport, _registry) = setup(config(1, 4)).await;
    let (leaving, mut leaving_seen) = capture("OrderCreated", false);
    let (staying, mut staying_seen) = capture("OrderCreated", false);
    broker.subscribe("orders", Arc::clone(&leaving));
    broker.subscribe("orders", Arc::clone(&staying));

    assert!(broker.unsubscribe("orders", &leaving));
    publish(&broker, "orders", "OrderCreated", json!({ "id": 4, "description": null })).await;

    let record = next(&mut staying_seen).await;
    assert_eq!(record.field("id"), Some(&json!(4)));
    assert_eq!(settled(&record).await, EventStatus::Processed);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(leaving_seen.try_recv().is_err());
    assert_eq!(broker.subscriber_count("orders"), 1);
    broker.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failing_subscriber_leaves_sibling_unaffected() {
    let (broker, _transport, _registry) = setup(config(1, 4)).await;
    let sibling_done = Arc::new(AtomicUsize::new(0));

    broker.subscribe(
        "orders",
        HandlerFn::arc("OrderCreated", |_record: Arc<EventRecord>| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Err::<(), _>(HandlerError::fail("always fails"))
        }),
    );
    let done = Arc::clone(&sibling_done);
    let (sibling_tx, mut sibling_seen) = mpsc::unbounded_channel();
    broker.subscribe(
        "orders",
        HandlerFn::arc("OrderAudited", move |record: Arc<EventRecord>| {
            let done = Arc::clone(&done);
            let _ = sibling_tx.send(Arc::clone(&record));
            async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, HandlerError>(())
            }
        }),
    );

    publish(&broker, "orders", "OrderCreated", json!({ "id": 5, "description": null })).await;

    let record = next(&mut sibling_seen).await;
    assert_eq!(record.field("id"), Some(&json!(5)));
    // The failing handler finishes last, so its outcome is the final status.
    tokio::time::timeout(Duration::from_secs(5), async {
        while record.status() != EventStatus::Failed {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("failing handler should mark the record");
    assert_eq!(sibling_done.load(Ordering::SeqCst), 1);

    publish(&broker, "orders", "OrderCreated", json!({ "id": 6, "description": null })).await;
    let later = next(&mut sibling_seen).await;
    assert_eq!(later.field("id"), Some(&json!(6)));
    broker.shutdown().await;
}

/// Schema registry whose lookups never answer.
struct UnresponsiveRegistry;

#[async_trait]
impl SchemaRegistry for UnresponsiveRegistry {
    async fn register_schema(
        &self,
        _subject: &str,
        _definition: &str,
    ) -> Result<SchemaId, SchemaError> {
        std::future::pending().await
    }

    async fn get_schema(&self, _id: SchemaId) -> Result<String, SchemaError> {
        std::future::pending().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_completes_with_unresponsive_registry() {
    let transport = MemoryTransport::new();
    let broker = Broker::builder(Arc::new(transport.clone()), Arc::new(UnresponsiveRegistry))
        .with_config(config(2, 4))
        .build();
    let (handler, _seen) = capture("OrderCreated", false);
    broker.subscribe("orders", handler);

    transport
        .send(
            "orders",
            "k",
            Bytes::from_static(&[2, 0]),
            Headers::for_event(7, "OrderCreated"),
        )
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.committed("orders", "group-orders").await < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("a worker should pick up the message");

    tokio::time::timeout(Duration::from_secs(3), broker.shutdown())
        .await
        .expect("shutdown should not wait on the registry");
    assert!(transport.is_closed());
}

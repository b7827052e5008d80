//! Publisher delivery policy tests against a scripted mock transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use medlink_core::queue::{OverflowPolicy, TelemetryQueue};
use medlink_core::retry::RetryPolicy;
use medlink_core::telemetry::TelemetrySnapshot;
use medlink_edge::{BrokerTransport, CircuitBreaker, EdgeError, Publisher};

/// Transport that fails until told otherwise, counting every invocation.
struct ScriptedTransport {
    calls: Arc<AtomicU32>,
    healthy: Arc<AtomicBool>,
}

#[async_trait]
impl BrokerTransport for ScriptedTransport {
    async fn publish(&mut self, _topic: &str, _payload: Vec<u8>) -> Result<(), EdgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EdgeError::NotConnected)
        }
    }
}

fn snapshot(device_id: &str) -> TelemetrySnapshot {
    let mut measurements = HashMap::new();
    measurements.insert("bloodFlow".to_string(), 300.0);
    TelemetrySnapshot::from_measurements(device_id, Utc::now(), measurements)
}

fn publisher_with(
    calls: Arc<AtomicU32>,
    healthy: Arc<AtomicBool>,
    breaker: CircuitBreaker,
) -> Publisher<ScriptedTransport> {
    let queue = TelemetryQueue::new(16, OverflowPolicy::Block);
    Publisher::new(
        queue,
        ScriptedTransport { calls, healthy },
        "medlink/dialysis",
        RetryPolicy::new(3).with_base_delay(Duration::from_millis(1)),
        breaker,
    )
}

#[tokio::test]
async fn successful_publish_takes_one_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(true));
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));
    let mut publisher = publisher_with(calls.clone(), healthy, breaker);

    publisher.publish_one(&snapshot("Device-001")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_the_transport_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(false));
    let breaker = CircuitBreaker::new(10, Duration::from_secs(30));
    let mut publisher = publisher_with(calls.clone(), healthy, breaker);

    let err = publisher.publish_one(&snapshot("Device-001")).await.unwrap_err();
    assert!(matches!(err, EdgeError::NotConnected));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn open_breaker_fails_fast_without_touching_the_transport() {
    let calls = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(false));
    // Threshold 5: the first message burns 3 attempts, the second opens
    // the breaker on its 2nd attempt; its 3rd attempt must not reach the
    // transport.
    let breaker = CircuitBreaker::new(5, Duration::from_millis(100));
    let mut publisher = publisher_with(calls.clone(), healthy.clone(), breaker);

    let err = publisher.publish_one(&snapshot("Device-001")).await.unwrap_err();
    assert!(matches!(err, EdgeError::NotConnected));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let err = publisher.publish_one(&snapshot("Device-001")).await.unwrap_err();
    assert!(matches!(err, EdgeError::CircuitOpen));
    assert_eq!(calls.load(Ordering::SeqCst), 5, "6th attempt was gated");

    // While open, further messages are discarded without transport calls.
    let err = publisher.publish_one(&snapshot("Device-001")).await.unwrap_err();
    assert!(matches!(err, EdgeError::CircuitOpen));
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    // After the cooldown the trial attempt reaches the transport again.
    tokio::time::sleep(Duration::from_millis(150)).await;
    healthy.store(true, Ordering::SeqCst);
    publisher.publish_one(&snapshot("Device-001")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn run_drains_queue_and_discards_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicBool::new(true));
    let queue = TelemetryQueue::new(16, OverflowPolicy::Block);
    let publisher = Publisher::new(
        queue.clone(),
        ScriptedTransport {
            calls: calls.clone(),
            healthy: healthy.clone(),
        },
        "medlink/dialysis",
        RetryPolicy::new(3).with_base_delay(Duration::from_millis(1)),
        CircuitBreaker::new(5, Duration::from_secs(30)),
    );

    queue.push(snapshot("Device-001")).await.unwrap();
    queue.push(snapshot("Device-002")).await.unwrap();
    queue.close();

    publisher.run().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

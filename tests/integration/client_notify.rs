//! Integration tests for the notification pipeline
//!
//! Tests cover:
//! - End-to-end notify with an in-memory backend
//! - Process context and call-site extras merging
//! - Filter ordering and short-circuit
//! - Synchronous-mode failure propagation
//! - Queue overflow handling in asynchronous mode
//! - Panic monitoring

use super::test_utils::{init_tracing, FailingBackend, GateBackend, MemoryBackend, MemoryLogger};
use faultline::client::Client;
use faultline::config::Config;
use faultline::context::Context;
use faultline::error::Error;
use faultline::notice::Extra;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn test_client(backend: Arc<MemoryBackend>) -> Client {
    let mut config = Config::default();
    config.api_key = "test-key".to_string();
    config.env = "test".to_string();
    config.backend = Some(backend);
    Client::new(config).unwrap()
}

#[test]
fn test_notify_string_end_to_end() {
    init_tracing();
    let backend = MemoryBackend::new();
    let client = test_client(Arc::clone(&backend));

    let token = client.notify("boom").unwrap();
    assert!(!token.is_empty());
    client.flush();

    let notices = backend.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "boom");
    assert!(notices[0].class.contains("OpaqueError"));
    assert_eq!(notices[0].token, token);
    assert_eq!(notices[0].env, "test");
}

#[test]
fn test_extras_shadow_process_context() {
    let backend = MemoryBackend::new();
    let client = test_client(Arc::clone(&backend));

    client.set_context(Context::from_iter([("a", 1), ("keep", 9)]));
    client
        .notify_with(
            "collision",
            vec![Extra::Context(Context::from_iter([("a", 2)]))],
        )
        .unwrap();
    client.flush();

    let notices = backend.notices();
    assert_eq!(notices[0].context.get("a"), Some(&Value::from(2)));
    assert_eq!(notices[0].context.get("keep"), Some(&Value::from(9)));
}

#[test]
fn test_filters_short_circuit_in_registration_order() {
    let backend = MemoryBackend::new();
    let client = test_client(Arc::clone(&backend));
    let second_ran = Arc::new(AtomicBool::new(false));

    client.before_notify(|_notice| Err("rejected by policy".into()));
    {
        let second_ran = Arc::clone(&second_ran);
        client.before_notify(move |_notice| {
            second_ran.store(true, Ordering::SeqCst);
            Ok(())
        });
    }

    let result = client.notify("should not send");
    match result {
        Err(Error::Rejected(err)) => assert_eq!(err.to_string(), "rejected by policy"),
        other => panic!("expected filter rejection, got {other:?}"),
    }
    assert!(!second_ran.load(Ordering::SeqCst));

    client.flush();
    assert!(backend.notices().is_empty());
    assert_eq!(client.stats().delivered, 0);
}

#[test]
fn test_filters_may_mutate_the_notice() {
    let backend = MemoryBackend::new();
    let client = test_client(Arc::clone(&backend));

    client.before_notify(|notice| {
        notice.context.set("scrubbed", true);
        notice.message = notice.message.replace("secret", "[redacted]");
        Ok(())
    });

    client.notify("secret leaked").unwrap();
    client.flush();

    let notices = backend.notices();
    assert_eq!(notices[0].message, "[redacted] leaked");
    assert_eq!(notices[0].context.get("scrubbed"), Some(&Value::from(true)));
}

#[test]
fn test_sync_mode_propagates_backend_failure() {
    let mut config = Config::default();
    config.sync = true;
    config.backend = Some(Arc::new(FailingBackend));
    let client = Client::new(config).unwrap();

    let result = client.notify("lost cause");
    assert!(matches!(result, Err(Error::Delivery(_))));

    // The queue was bypassed entirely: no background task was ever created.
    let stats = client.stats();
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.pending, 0);
}

#[test]
fn test_sync_mode_delivers_inline() {
    let backend = MemoryBackend::new();
    let mut config = Config::default();
    config.sync = true;
    config.backend = Some(Arc::clone(&backend) as _);
    let client = Client::new(config).unwrap();

    let token = client.notify("inline").unwrap();

    // Delivered before notify returned; no flush required.
    let notices = backend.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].token, token);
}

#[test]
fn test_async_overflow_is_logged_not_propagated() {
    let (backend, mut started_rx, gate) = GateBackend::new();
    let logger = MemoryLogger::new();

    let mut config = Config::default();
    config.queue_size = 1;
    config.concurrency = 1;
    config.backend = Some(backend as _);
    config.logger = Some(Arc::clone(&logger) as _);
    let client = Client::new(config).unwrap();

    client.notify("first").unwrap();
    started_rx.blocking_recv().unwrap();

    client.notify("second").unwrap();
    let overflow_token = client.notify("third").unwrap();
    assert!(!overflow_token.is_empty());
    assert!(logger.contains("notify error"));
    assert!(logger.contains("delivery queue full"));

    gate.add_permits(2);
    client.flush();

    let stats = client.stats();
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn test_monitor_reports_then_reraises_the_original_panic() {
    let backend = MemoryBackend::new();
    let client = test_client(Arc::clone(&backend));

    let result = catch_unwind(AssertUnwindSafe(|| {
        client.monitor(|| -> () { panic!("kapow") })
    }));

    let payload = result.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"kapow"));

    // monitor flushed before re-raising, so the notice is already recorded.
    let notices = backend.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "kapow");
}

#[test]
fn test_monitor_passes_values_through() {
    let backend = MemoryBackend::new();
    let client = test_client(Arc::clone(&backend));

    let value = client.monitor(|| 41 + 1);
    assert_eq!(value, 42);
    client.flush();
    assert!(backend.notices().is_empty());
}

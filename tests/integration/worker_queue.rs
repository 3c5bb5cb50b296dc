//! Integration tests for the delivery worker
//!
//! Tests cover:
//! - FIFO execution with a single executor
//! - Overflow accounting on a bounded queue
//! - Flush completeness
//! - Failure routing to the logger

use super::test_utils::MemoryLogger;
use faultline::error::Error;
use faultline::worker::{DeliveryTask, Worker};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

fn counting_task(counter: Arc<AtomicUsize>) -> DeliveryTask {
    Box::new(move || {
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

#[test]
fn test_single_executor_runs_tasks_in_fifo_order() {
    let logger = MemoryLogger::new();
    let worker = Worker::new(32, 1, logger).unwrap();
    let order: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

    for i in 0..8 {
        let order = Arc::clone(&order);
        let task: DeliveryTask = Box::new(move || {
            Box::pin(async move {
                order.lock().push(i);
                Ok(())
            })
        });
        worker.push(task).unwrap();
    }

    worker.flush();
    assert_eq!(*order.lock(), (0..8).collect::<Vec<_>>());
}

#[test]
fn test_overflow_drops_exactly_one_task() {
    let logger = MemoryLogger::new();
    let worker = Worker::new(2, 1, Arc::clone(&logger) as _).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let (started_tx, started_rx) = std::sync::mpsc::channel();

    // First task parks in the executor until released, guaranteeing the
    // queue actually fills behind it.
    {
        let counter = Arc::clone(&counter);
        let gate = Arc::clone(&gate);
        let task: DeliveryTask = Box::new(move || {
            Box::pin(async move {
                started_tx.send(()).unwrap();
                gate.acquire().await.unwrap().forget();
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        worker.push(task).unwrap();
    }
    started_rx.recv().unwrap();

    worker.push(counting_task(Arc::clone(&counter))).unwrap();
    worker.push(counting_task(Arc::clone(&counter))).unwrap();

    let overflow = worker.push(counting_task(Arc::clone(&counter)));
    assert!(matches!(overflow, Err(Error::QueueFull { capacity: 2 })));
    assert!(logger.contains("delivery queue full"));

    gate.add_permits(1);
    worker.flush();

    // The three accepted tasks all completed; the rejected one never ran.
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    let stats = worker.stats();
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.pending, 0);
}

#[test]
fn test_flush_waits_for_every_prior_task() {
    let logger = MemoryLogger::new();
    let worker = Worker::new(128, 4, logger).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..50 {
        worker.push(counting_task(Arc::clone(&counter))).unwrap();
    }
    worker.flush();

    assert_eq!(counter.load(Ordering::SeqCst), 50);
    let stats = worker.stats();
    assert_eq!(stats.delivered, 50);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn test_failures_are_logged_and_do_not_stall_the_queue() {
    let logger = MemoryLogger::new();
    let worker = Worker::new(16, 1, Arc::clone(&logger) as _).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let failing: DeliveryTask =
        Box::new(|| Box::pin(async { Err(Error::Delivery("collector returned 500".to_string())) }));
    worker.push(failing).unwrap();
    worker.push(counting_task(Arc::clone(&counter))).unwrap();

    worker.flush();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(logger.contains("delivery failed"));
    let stats = worker.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.delivered, 1);
}

#[test]
fn test_flush_with_no_pending_work_returns_immediately() {
    let logger = MemoryLogger::new();
    let worker = Worker::new(8, 2, logger).unwrap();
    worker.flush();
    assert_eq!(worker.stats(), Default::default());
}

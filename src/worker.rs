//! Background delivery worker.
//!
//! A bounded FIFO queue of delivery tasks consumed by a fixed pool of
//! long-lived executors on a worker-owned runtime. Pushing never blocks the
//! caller: a full queue rejects the task immediately and the drop is
//! reported through the [`Logger`] sink. Flushing blocks the calling thread
//! until every task enqueued strictly before the call has completed; tasks
//! enqueued concurrently during the flush are not waited for.

use crate::error::Error;
use crate::logging::Logger;
use futures::future::BoxFuture;
use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// One unit of asynchronous work: a single notice's delivery attempt.
/// Created at enqueue time, discarded after execution.
pub type DeliveryTask = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), Error>> + Send>;

/// Counters describing the worker's lifetime activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Tasks queued, not yet picked up by an executor.
    pub pending: usize,
    /// Tasks currently executing.
    pub in_flight: usize,
    pub delivered: u64,
    pub failed: u64,
    /// Tasks rejected because the queue was full.
    pub dropped: u64,
}

struct QueueState {
    queue: VecDeque<(u64, DeliveryTask)>,
    /// Sequence number of the most recently accepted task.
    pushed: u64,
    /// Highest sequence S such that every task numbered 1..=S has completed.
    drained: u64,
    /// Completions above the drained watermark, pending contiguity.
    completed: BinaryHeap<Reverse<u64>>,
    running: bool,
    stats: WorkerStats,
}

impl QueueState {
    fn record_completion(&mut self, seq: u64) {
        self.completed.push(Reverse(seq));
        while self.completed.peek() == Some(&Reverse(self.drained + 1)) {
            self.completed.pop();
            self.drained += 1;
        }
    }
}

struct Shared {
    state: Mutex<QueueState>,
    drained_cv: Condvar,
    notify: Notify,
    capacity: usize,
    logger: Arc<dyn Logger>,
}

/// Bounded asynchronous delivery queue with a fixed executor pool.
pub struct Worker {
    shared: Arc<Shared>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl Worker {
    /// Start a worker with `concurrency` executors consuming a queue bounded
    /// at `capacity`. A single executor preserves FIFO completion order.
    pub fn new(
        capacity: usize,
        concurrency: usize,
        logger: Arc<dyn Logger>,
    ) -> Result<Worker, Error> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                pushed: 0,
                drained: 0,
                completed: BinaryHeap::new(),
                running: true,
                stats: WorkerStats::default(),
            }),
            drained_cv: Condvar::new(),
            notify: Notify::new(),
            capacity,
            logger,
        });

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(concurrency)
            .thread_name("faultline-delivery")
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("failed to start delivery runtime: {e}")))?;

        for id in 0..concurrency {
            runtime.spawn(executor_loop(id, Arc::clone(&shared)));
        }

        debug!(target: "faultline", executors = concurrency, capacity, "delivery worker started");

        Ok(Worker {
            shared,
            runtime: Some(runtime),
        })
    }

    /// Enqueue a delivery task. Never blocks: returns
    /// [`Error::QueueFull`] immediately when no capacity remains, after
    /// reporting the drop to the logger and counting it as lost.
    pub fn push(&self, task: DeliveryTask) -> Result<(), Error> {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return Err(Error::Stopped);
            }
            if state.queue.len() >= self.shared.capacity {
                state.stats.dropped += 1;
                drop(state);
                self.shared.logger.log(&format!(
                    "delivery queue full (capacity {}), dropping notice",
                    self.shared.capacity
                ));
                return Err(Error::QueueFull {
                    capacity: self.shared.capacity,
                });
            }
            state.pushed += 1;
            let seq = state.pushed;
            state.queue.push_back((seq, task));
            state.stats.pending = state.queue.len();
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Block the calling thread until every task enqueued strictly before
    /// this call has completed, successfully or not. Tasks pushed while the
    /// flush is in progress are not waited for. Safe from any thread.
    pub fn flush(&self) {
        let mut state = self.shared.state.lock();
        let target = state.pushed;
        while state.drained < target {
            self.shared.drained_cv.wait(&mut state);
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.shared.state.lock().stats.clone()
    }

    /// Run a future to completion on the worker's runtime. Used for
    /// synchronous-mode delivery, which bypasses the queue entirely.
    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime
            .as_ref()
            .expect("delivery runtime alive until drop")
            .block_on(future)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
        }
        self.shared.notify.notify_waiters();
        // Tasks still queued or in flight are lost, by design; flush() is
        // the last-chance drain before teardown.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn executor_loop(id: usize, shared: Arc<Shared>) {
    debug!(target: "faultline", executor = id, "delivery executor started");
    loop {
        let next = {
            let mut state = shared.state.lock();
            if !state.running {
                break;
            }
            let next = state.queue.pop_front();
            if next.is_some() {
                state.stats.pending = state.queue.len();
                state.stats.in_flight += 1;
            }
            next
        };

        let Some((seq, task)) = next else {
            shared.notify.notified().await;
            continue;
        };

        let result = task().await;

        let failure = {
            let mut state = shared.state.lock();
            state.stats.in_flight -= 1;
            let failure = match result {
                Ok(()) => {
                    state.stats.delivered += 1;
                    None
                }
                Err(err) => {
                    state.stats.failed += 1;
                    Some(err)
                }
            };
            state.record_completion(seq);
            failure
        };
        shared.drained_cv.notify_all();

        // Delivery errors never escalate to the caller that enqueued the
        // task; they are routed to the diagnostic sink only.
        if let Some(err) = failure {
            shared.logger.log(&format!("delivery failed: {err}"));
        }
    }
    debug!(target: "faultline", executor = id, "delivery executor stopped");
}

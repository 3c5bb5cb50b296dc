//! Notification orchestrator.
//!
//! [`Client`] is the manager for interacting with the collector. It holds
//! the configuration, the process-wide context, the filter chain, and the
//! delivery worker, and implements the public reporting API.

use crate::backend::{Backend, ServerBackend};
use crate::config::Config;
use crate::context::{Context, ContextStore};
use crate::error::{BoxError, Error};
use crate::fault::{Fault, IntoFault};
use crate::logging::{Logger, TracingLogger};
use crate::notice::{Extra, Notice};
use crate::worker::{DeliveryTask, Worker, WorkerStats};
use parking_lot::RwLock;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Pre-delivery callback. Runs in registration order; the first filter that
/// returns an error vetoes the notice and its error is returned to the
/// notify caller as-is.
pub type Filter = Box<dyn Fn(&mut Notice) -> Result<(), BoxError> + Send + Sync>;

/// Error-reporting client.
pub struct Client {
    config: Config,
    backend: Arc<dyn Backend>,
    logger: Arc<dyn Logger>,
    context: ContextStore,
    worker: Worker,
    filters: RwLock<Vec<Filter>>,
}

impl Client {
    /// Build a client from `config`. Configuration is read once here; there
    /// is no hot reload.
    pub fn new(mut config: Config) -> Result<Client, Error> {
        config.validate()?;

        let logger: Arc<dyn Logger> = config
            .logger
            .take()
            .unwrap_or_else(|| Arc::new(TracingLogger));
        let backend = match config.backend.take() {
            Some(backend) => backend,
            None => Arc::new(ServerBackend::new(&config)?),
        };
        let worker = Worker::new(config.queue_size, config.concurrency, Arc::clone(&logger))?;

        Ok(Client {
            config,
            backend,
            logger,
            context: ContextStore::default(),
            worker,
            filters: RwLock::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Merge `context` into the process-wide context reported with every
    /// subsequent notice.
    pub fn set_context(&self, context: Context) {
        self.context.update(context);
    }

    /// Register a pre-delivery filter. Filters run in registration order;
    /// there is no removal API.
    pub fn before_notify<F>(&self, filter: F)
    where
        F: Fn(&mut Notice) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.filters.write().push(Box::new(filter));
    }

    /// Report `err` to the collector. Returns the notice token on success.
    pub fn notify(&self, err: impl IntoFault) -> Result<String, Error> {
        self.notify_fault(err.into_fault(1), Vec::new())
    }

    /// Report `err` with auxiliary payload fragments, applied in call order
    /// on top of the process context.
    pub fn notify_with(&self, err: impl IntoFault, extras: Vec<Extra>) -> Result<String, Error> {
        self.notify_fault(err.into_fault(1), extras)
    }

    pub(crate) fn notify_fault(&self, fault: Fault, extras: Vec<Extra>) -> Result<String, Error> {
        let mut notice = Notice::new(&self.config, fault, self.context.snapshot(), extras);

        {
            let filters = self.filters.read();
            for filter in filters.iter() {
                if let Err(err) = filter(&mut notice) {
                    return Err(Error::Rejected(err));
                }
            }
        }

        let token = notice.token.clone();
        if self.config.sync {
            let backend = Arc::clone(&self.backend);
            if let Err(err) = self.worker.block_on(async move { backend.deliver(&notice).await })
            {
                self.logger.log(&format!("notify error: {err}"));
                return Err(err);
            }
        } else {
            let backend = Arc::clone(&self.backend);
            let task: DeliveryTask =
                Box::new(move || Box::pin(async move { backend.deliver(&notice).await }));
            // Queue overflow is a telemetry loss, not an application
            // failure: log it and still hand the token back.
            if let Err(err) = self.worker.push(task) {
                self.logger.log(&format!("notify error: {err}"));
            }
        }

        Ok(token)
    }

    /// Block until every notice enqueued before this call has been
    /// delivered or failed. Call as the last action before process exit.
    pub fn flush(&self) {
        self.worker.flush();
    }

    pub fn stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    /// Run `f`, reporting any panic before re-raising it.
    ///
    /// On panic the payload is normalized and notified, pending deliveries
    /// are flushed so the notice is not lost to process exit, and the
    /// original payload is re-raised unchanged. A panic is observed, never
    /// suppressed.
    pub fn monitor<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => value,
            Err(payload) => {
                let fault = Fault::of_panic(payload.as_ref(), 1);
                if let Err(err) = self.notify_fault(fault, Vec::new()) {
                    self.logger.log(&format!("panic notify error: {err}"));
                }
                self.flush();
                resume_unwind(payload)
            }
        }
    }

    pub(crate) fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish()
    }
}

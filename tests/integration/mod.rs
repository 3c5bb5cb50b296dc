//! Integration tests for the faultline reporting client

mod client_notify;
mod worker_queue;

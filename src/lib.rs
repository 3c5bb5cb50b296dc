//! Faultline: Asynchronous Error Reporting
//!
//! A client for capturing runtime errors (explicit reports and recovered
//! panics), enriching them with a structured stack trace and request
//! context, and delivering them to a remote collector without blocking the
//! caller's execution path.
//!
//! ```no_run
//! use faultline::client::Client;
//! use faultline::config::Config;
//! use faultline::context::Context;
//!
//! let mut config = Config::from_env();
//! config.api_key = "project-api-key".to_string();
//! let client = Client::new(config).expect("client");
//!
//! client.set_context(Context::from_iter([("release", "1.4.2")]));
//! client.notify("something broke").expect("notify");
//!
//! // Drain pending deliveries before exit.
//! client.flush();
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fault;
pub mod logging;
pub mod middleware;
pub mod notice;
pub mod stack;
pub mod worker;

pub use backend::Backend;
pub use client::Client;
pub use config::Config;
pub use context::Context;
pub use error::Error;
pub use fault::{Fault, IntoFault};
pub use logging::Logger;
pub use notice::{Extra, Notice};

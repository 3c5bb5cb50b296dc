//! Notice assembly and collector payload shaping.
//!
//! A [`Notice`] is the fully assembled, ready-to-deliver error report: the
//! normalized fault fields, the merged context, request metadata from
//! call-site extras, and server metadata from the configuration. Filters may
//! mutate a notice before dispatch; after dispatch it is never re-read.

use crate::config::Config;
use crate::context::Context;
use crate::fault::Fault;
use crate::stack::Frame;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Form or query parameters attached to a notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Vec<String>>);

impl Params {
    pub fn new() -> Params {
        Params::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Params {
        self.0.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// CGI-style request variables, keyed with the fixed `HTTP_` prefix scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CgiData(BTreeMap<String, String>);

impl CgiData {
    pub fn new() -> CgiData {
        CgiData::default()
    }

    /// Insert a variable unless the key is already present (first value wins).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut CgiData {
        self.0.entry(key.into()).or_insert_with(|| value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Auxiliary payload fragment accepted by `notify_with`, applied in call order.
#[derive(Debug, Clone)]
pub enum Extra {
    Context(Context),
    Params(Params),
    CgiData(CgiData),
    Url(String),
}

/// The assembled error report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    /// Delivery correlation id, assigned at construction.
    pub token: String,
    pub class: String,
    pub message: String,
    pub backtrace: Vec<Frame>,
    pub context: Context,
    pub params: Params,
    pub cgi_data: CgiData,
    pub url: String,
    pub env: String,
    pub hostname: String,
    pub project_root: String,
}

impl Notice {
    /// Build a notice from a normalized fault plus the process context
    /// snapshot and call-site extras. Extras apply in order and shadow
    /// process context keys on collision.
    pub fn new(config: &Config, fault: Fault, context: Context, extras: Vec<Extra>) -> Notice {
        let mut notice = Notice {
            token: Uuid::new_v4().to_string(),
            class: fault.class().to_string(),
            message: fault.message().to_string(),
            backtrace: fault.stack().to_vec(),
            context,
            params: Params::new(),
            cgi_data: CgiData::new(),
            url: String::new(),
            env: config.env.clone(),
            hostname: config.hostname.clone(),
            project_root: config.root.clone(),
        };

        for extra in extras {
            match extra {
                Extra::Context(context) => notice.context.merge(&context),
                Extra::Params(params) => notice.params = params,
                Extra::CgiData(cgi_data) => notice.cgi_data = cgi_data,
                Extra::Url(url) => notice.url = url,
            }
        }

        notice
    }

    /// Collector wire document.
    pub fn payload(&self) -> Value {
        json!({
            "notifier": {
                "name": "faultline",
                "url": "https://github.com/faultline-rs/faultline",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "error": {
                "token": self.token,
                "class": self.class,
                "message": self.message,
                "backtrace": self.backtrace,
            },
            "request": {
                "context": self.context,
                "params": self.params,
                "cgi_data": self.cgi_data,
                "url": self.url,
            },
            "server": {
                "project_root": { "path": self.project_root },
                "environment_name": self.env,
                "hostname": self.hostname,
            },
        })
    }
}

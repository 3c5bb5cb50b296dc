//! Request and process context attached to notices.
//!
//! A [`Context`] is a plain string-to-value mapping. Each client owns one
//! process-wide instance behind a lock ([`ContextStore`]); notify merges a
//! consistent snapshot of it into every notice, and call-site extras layered
//! on top shadow colliding keys.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// String-keyed mapping of arbitrary JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(BTreeMap<String, Value>);

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Context {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Merge `other` into `self`; keys from `other` win on collision.
    pub fn merge(&mut self, other: &Context) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Context {
        let mut context = Context::new();
        for (key, value) in iter {
            context.set(key, value);
        }
        context
    }
}

/// Process-wide context shared by all calls on a client instance.
///
/// Updates and reads are mutually exclusive; a snapshot taken during notify
/// is always complete, never a partially applied merge.
#[derive(Debug, Default)]
pub(crate) struct ContextStore {
    inner: RwLock<Context>,
}

impl ContextStore {
    pub(crate) fn update(&self, context: Context) {
        self.inner.write().merge(&context);
    }

    pub(crate) fn snapshot(&self) -> Context {
        self.inner.read().clone()
    }
}

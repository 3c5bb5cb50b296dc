//! Fault normalization.
//!
//! Converts an arbitrary failure value into exactly one canonical, stack-
//! annotated [`Fault`]. Normalizing a value that is already a `Fault` returns
//! it unchanged, so repeated recovery/re-report cycles along one propagation
//! chain never re-capture a stack or re-derive a classification.

use crate::error::BoxError;
use crate::stack::{capture_stack, Frame};
use std::any::Any;
use std::fmt;

/// Canonical representation of a failure.
///
/// Holds the underlying cause, a display message, a classification string
/// (the concrete cause's type name, used for grouping on the collector), and
/// the stack captured when the failure was first normalized.
#[derive(Debug)]
pub struct Fault {
    cause: BoxError,
    message: String,
    class: String,
    stack: Vec<Frame>,
}

impl Fault {
    /// Normalize `value`, with the caller of `new` as frame zero.
    pub fn new(value: impl IntoFault) -> Fault {
        value.into_fault(1)
    }

    /// Normalize `value` with an explicit frame offset.
    ///
    /// `offset` counts call frames between the caller of `with_offset` and
    /// the frame that should appear as frame zero: a helper that wraps this
    /// constructor passes 1, a helper two levels out passes 2, and so on.
    pub fn with_offset(value: impl IntoFault, offset: usize) -> Fault {
        value.into_fault(offset + 1)
    }

    /// Build a fault from a recovered panic payload without consuming it,
    /// so the payload can still be re-raised unchanged.
    pub fn of_panic(payload: &(dyn Any + Send), offset: usize) -> Fault {
        let message = panic_message(payload);
        Fault::build(
            Box::new(OpaqueError(message)),
            class_of::<OpaqueError>(),
            offset + 1,
        )
    }

    fn build(cause: BoxError, class: String, skip: usize) -> Fault {
        Fault {
            message: cause.to_string(),
            class,
            stack: capture_stack(skip + 1),
            cause,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn stack(&self) -> &[Frame] {
        &self.stack
    }

    /// The failure value this fault was normalized from.
    pub fn cause(&self) -> &(dyn std::error::Error + 'static) {
        self.cause.as_ref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Conversion of a failure value into a [`Fault`].
///
/// `offset` counts call frames between the caller of `into_fault` and the
/// frame that should appear as frame zero; passing 0 makes the direct caller
/// frame zero. Wrappers must add one per level; the offset arithmetic is a
/// contract the caller honors, not something normalization infers.
pub trait IntoFault {
    fn into_fault(self, offset: usize) -> Fault;
}

impl<E> IntoFault for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_fault(self, offset: usize) -> Fault {
        let class = class_of::<E>();
        let boxed: BoxError = Box::new(self);
        match boxed.downcast::<Fault>() {
            // Already canonical: pass through untouched.
            Ok(fault) => *fault,
            Err(cause) => Fault::build(cause, class, offset + 1),
        }
    }
}

impl IntoFault for String {
    fn into_fault(self, offset: usize) -> Fault {
        Fault::build(
            Box::new(OpaqueError(self)),
            class_of::<OpaqueError>(),
            offset + 1,
        )
    }
}

impl IntoFault for &str {
    fn into_fault(self, offset: usize) -> Fault {
        Fault::build(
            Box::new(OpaqueError(self.to_string())),
            class_of::<OpaqueError>(),
            offset + 1,
        )
    }
}

/// Failure synthesized from a value with no error behavior of its own.
#[derive(Debug)]
pub struct OpaqueError(String);

impl fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for OpaqueError {}

fn class_of<T>() -> String {
    std::any::type_name::<T>().to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "panic with non-string payload".to_string()
}

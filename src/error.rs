//! Failure type for dispatched runnables.

use std::any::Any;
use thiserror::Error;

/// Failure raised inside a dispatched runnable.
///
/// The scheduler's own operations never fail; the only user-visible failure
/// channel is this value, produced when a runnable panics and handed to the
/// error handler registered on the scheduler (see
/// [`Scheduler::set_error_handler`](crate::Scheduler::set_error_handler)).
/// Without a handler the failure is logged and swallowed.
#[derive(Debug, Clone, Error)]
#[error("runnable panicked: {message}")]
pub struct RunnableFailure {
    message: String,
}

impl RunnableFailure {
    /// Render a panic payload into a failure value.
    ///
    /// Panic payloads are `&str` or `String` in practice; anything else is
    /// reported opaquely.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_string()
        };
        Self { message }
    }

    /// The rendered panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let failure = RunnableFailure::from_panic(payload);
        assert_eq!(failure.message(), "boom");
    }

    #[test]
    fn test_from_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new("kaboom".to_string());
        let failure = RunnableFailure::from_panic(payload);
        assert_eq!(failure.message(), "kaboom");
    }

    #[test]
    fn test_from_opaque_payload() {
        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        let failure = RunnableFailure::from_panic(payload);
        assert_eq!(failure.message(), "opaque panic payload");
    }
}

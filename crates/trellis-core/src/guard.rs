//! Containment of panics raised by user callbacks.
//!
//! Widget hooks, invoke-later jobs, timer ticks and signal slots are user code. A panic
//! inside one of them must not tear down the frame pump or leave the widget tree half
//! mutated, so every such call site goes through [`guarded`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::logging::targets;

/// Run `f`, catching any panic it raises.
///
/// Returns `None` and logs at `error` level when `f` panicked. `boundary` names the call
/// site (for example `"child_added"` or `"invoke_later"`) and is included in the log record.
pub fn guarded<R>(boundary: &'static str, f: impl FnOnce() -> R) -> Option<R> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(target: targets::CALLBACK, boundary, %message, "callback panicked");
            None
        }
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_returns_value() {
        assert_eq!(guarded("test", || 7), Some(7));
    }

    #[test]
    fn test_guarded_contains_panic() {
        let result: Option<()> = guarded("test", || panic!("boom"));
        assert!(result.is_none());
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}

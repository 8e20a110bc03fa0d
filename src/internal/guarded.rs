//! Runs caller-supplied callbacks so that neither an error nor a panic
//! escapes into cache bookkeeping.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::BoxError;

/// Runs `f`, turning a returned error or a panic into a message.
pub(crate) fn guarded<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

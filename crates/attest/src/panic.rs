//! Panic payload formatting helpers.
//!
//! Test bodies, plugins, and lifecycle callbacks run on spawned tasks; when one
//! panics the payload comes back through a `JoinError`. These helpers turn the
//! payload into a readable message for outcomes and fault logs.

use std::any::Any;

/// Formats a panic payload into a readable message.
///
/// String payloads are extracted directly; numeric payloads are rendered with
/// `Display`, and anything else falls back to a placeholder naming the type as
/// opaque.
///
/// # Examples
///
/// ```
/// use attest::panic_message;
/// use std::any::Any;
///
/// let payload: Box<dyn Any + Send> = Box::new("boom");
/// assert_eq!(panic_message(payload.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .or_else(|| payload.downcast_ref::<i32>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<i64>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<u32>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<u64>().map(ToString::to_string))
        .or_else(|| payload.downcast_ref::<usize>().map(ToString::to_string))
        .unwrap_or_else(|| "<non-string panic payload>".to_owned())
}

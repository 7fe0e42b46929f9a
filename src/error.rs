use std::any::Any;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
	/// The initial value did not arrive within the given bound.
	/// The watcher is unaffected and may still be initialized later.
	#[error("initial value was not available within {0:?}")]
	Timeout(Duration),

	/// The watcher was closed before the initial value arrived.
	#[error("watcher was closed")]
	Cancelled,

	/// The value was requested before the watcher received anything.
	#[error("value is not available yet")]
	NotInitialized,

	#[error("invalid JSON pointer {0:?}: must be empty or start with '/'")]
	InvalidJsonPointer(String),
}

pub type Result<T, E = WatchError> = std::result::Result<T, E>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"<non-string panic payload>"
	}
}

//! Watchers over revisioned configuration entries.
//!
//! A [`RootWatcher`] is fed `(revision, value)` pairs by a transport and
//! fans them out to its listeners. Any watcher can be forked into a
//! [`TransformingWatcher`] that projects the parent value and stays quiet
//! while the projection does not change.

pub mod macros;

mod body;
mod error;
mod executor;
mod ext;
mod initial;
#[cfg(feature = "json")]
mod json;
mod latest;
mod poll;
mod registry;
mod revision;
mod root;
mod transform;

use std::sync::Arc;
use std::time::Duration;

pub use error::{Result, WatchError};
pub use executor::{Executor, Inline, Spawn, Task};
pub use ext::WatcherExt;
pub use initial::InitialValue;
#[cfg(feature = "json")]
pub use json::{at_json_pointer, AsJson};
pub use latest::Latest;
pub use poll::{Fetch, PollConfig, Poller};
pub use registry::{Listener, ListenerId};
pub use revision::Revision;
pub use root::RootWatcher;
pub use transform::TransformingWatcher;

/// Advisory lower bound for timeouts passed to
/// [`WatcherExt::await_initial_value_timeout`] and
/// [`WatcherExt::await_initial_value_or`]. It leaves room for the
/// transport to retry a few times before the caller gives up.
pub const RECOMMENDED_AWAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Watches the changes of a file or a directory.
///
/// Only the primitive operations live here, everything else is provided
/// by [`WatcherExt`].
pub trait Watcher<T>: Send + Sync + 'static {
	/// Label used in diagnostics.
	fn name(&self) -> &str;

	/// Returns the handle that completes when the first value is accepted.
	fn initial_value_future(&self) -> InitialValue<T>;

	/// Returns the latest revision and value.
	///
	/// Fails with [`WatchError::NotInitialized`] if nothing was accepted yet.
	fn latest(&self) -> Result<Arc<Latest<T>>>;

	/// Registers a listener invoked through `executor` for every accepted
	/// update. If a value is already available, the listener receives it
	/// right away.
	fn watch_with(&self, listener: Listener<T>, executor: Arc<dyn Executor>) -> ListenerId;

	/// Removes a listener. Returns `false` if it was not registered.
	fn unwatch(&self, id: ListenerId) -> bool;

	/// Stops watching. Calling it more than once has no effect.
	fn close(&self);

	fn is_closed(&self) -> bool;
}

impl<T, W> Watcher<T> for Arc<W>
where
	W: Watcher<T> + ?Sized,
{
	fn name(&self) -> &str {
		(**self).name()
	}

	fn initial_value_future(&self) -> InitialValue<T> {
		(**self).initial_value_future()
	}

	fn latest(&self) -> Result<Arc<Latest<T>>> {
		(**self).latest()
	}

	fn watch_with(&self, listener: Listener<T>, executor: Arc<dyn Executor>) -> ListenerId {
		(**self).watch_with(listener, executor)
	}

	fn unwatch(&self, id: ListenerId) -> bool {
		(**self).unwatch(id)
	}

	fn close(&self) {
		(**self).close()
	}

	fn is_closed(&self) -> bool {
		(**self).is_closed()
	}
}

use std::fmt::Debug;
use std::sync::Arc;

use crate::body::WatchBody;
use crate::error::Result;
use crate::executor::Executor;
use crate::{InitialValue, Latest, Listener, ListenerId, Revision, Watcher};

/// A watcher fed directly by a transport.
///
/// Every accepted revision is delivered, even if the value did not
/// change. Revisions older than the current one are rejected.
pub struct RootWatcher<T> {
	body: Arc<WatchBody<T>>,
}

impl<T> Clone for RootWatcher<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> RootWatcher<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(name: impl Into<String>) -> Self {
		RootWatcher {
			body: Arc::new(WatchBody::new(name.into())),
		}
	}

	/// Offers a new value. Returns `true` if it was accepted.
	#[inline]
	pub fn push(&self, revision: Revision, value: T) -> bool {
		self.push_latest(Latest::new(revision, value))
	}

	pub fn push_latest(&self, latest: Latest<T>) -> bool {
		self.body.accept(latest, |current, next| match current {
			Some(current) if next.revision() < current.revision() => {
				tracing::debug!(
					watcher = %self.body.name(),
					current = %current.revision(),
					offered = %next.revision(),
					"rejecting an out-of-order revision"
				);
				false
			}
			_ => true,
		})
	}
}

impl<T> Watcher<T> for RootWatcher<T>
where
	T: Send + Sync + 'static,
{
	fn name(&self) -> &str {
		self.body.name()
	}

	fn initial_value_future(&self) -> InitialValue<T> {
		self.body.initial_value_future()
	}

	fn latest(&self) -> Result<Arc<Latest<T>>> {
		self.body.latest()
	}

	fn watch_with(&self, listener: Listener<T>, executor: Arc<dyn Executor>) -> ListenerId {
		self.body.watch(listener, executor)
	}

	fn unwatch(&self, id: ListenerId) -> bool {
		self.body.unwatch(id)
	}

	/// Closes the watcher and drops every listener, including the
	/// subscriptions of children that were never closed.
	fn close(&self) {
		self.body.close();
	}

	fn is_closed(&self) -> bool {
		self.body.is_closed()
	}
}

impl<T> Debug for RootWatcher<T>
where
	T: Debug + Send + Sync + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RootWatcher")
			.field("name", &self.body.name())
			.field("latest", &self.body.latest().ok())
			.finish()
	}
}

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::body::WatchBody;
use crate::error::{panic_message, Result};
use crate::executor::{self, Executor};
use crate::{InitialValue, Latest, Listener, ListenerId, Revision, Watcher};

/// A watcher derived from a parent by applying a transformation to each
/// of its values.
///
/// Listeners are only notified when the transformed value changes. The
/// parent owns the subscription: closing the child deregisters it from
/// the parent and leaves the parent running.
pub struct TransformingWatcher<T: 'static, U> {
	inner: Arc<TransformingInner<T, U>>,
}

struct TransformingInner<T: 'static, U> {
	parent: Arc<dyn Watcher<T>>,
	body: Arc<WatchBody<U>>,
	subscription: ListenerId,
}

impl<T: 'static, U> Drop for TransformingInner<T, U> {
	fn drop(&mut self) {
		// The last handle is gone, nobody can observe this child any more.
		if self.parent.unwatch(self.subscription) {
			tracing::debug!(
				watcher = %self.body.name(),
				parent = %self.parent.name(),
				"dropped without close, detached from parent"
			);
		}
	}
}

impl<T: 'static, U> Clone for TransformingWatcher<T, U> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T, U> TransformingWatcher<T, U>
where
	T: Send + Sync + 'static,
	U: PartialEq + Send + Sync + 'static,
{
	pub fn new<F>(parent: Arc<dyn Watcher<T>>, label: &str, transform: F) -> Self
	where
		F: Fn(&T) -> anyhow::Result<U> + Send + Sync + 'static,
	{
		let body = Arc::new(WatchBody::new(format!("{} -> {}", parent.name(), label)));

		let sink = body.clone();
		let subscription = parent.watch_with(
			Box::new(move |revision: Revision, value: &T| {
				let derived = panic::catch_unwind(AssertUnwindSafe(|| transform(value)))
					.unwrap_or_else(|payload| {
						Err(anyhow::anyhow!("transformation panicked: {}", panic_message(&*payload)))
					});
				let derived = match derived {
					Ok(derived) => derived,
					Err(error) => {
						tracing::warn!(
							watcher = %sink.name(),
							%revision,
							error = %format_args!("{error:#}"),
							"transformation failed, keeping the previous value"
						);
						return;
					}
				};

				sink.accept(Latest::new(revision, derived), |current, next| match current {
					Some(current) if current.value() == next.value() => {
						tracing::trace!(watcher = %sink.name(), %revision, "transformed value unchanged");
						false
					}
					_ => true,
				});
			}),
			executor::inline(),
		);

		TransformingWatcher {
			inner: Arc::new(TransformingInner {
				parent,
				body,
				subscription,
			}),
		}
	}

	pub fn parent(&self) -> &Arc<dyn Watcher<T>> {
		&self.inner.parent
	}
}

impl<T, U> Watcher<U> for TransformingWatcher<T, U>
where
	T: Send + Sync + 'static,
	U: PartialEq + Send + Sync + 'static,
{
	fn name(&self) -> &str {
		self.inner.body.name()
	}

	fn initial_value_future(&self) -> InitialValue<U> {
		self.inner.body.initial_value_future()
	}

	fn latest(&self) -> Result<Arc<Latest<U>>> {
		self.inner.body.latest()
	}

	fn watch_with(&self, listener: Listener<U>, executor: Arc<dyn Executor>) -> ListenerId {
		self.inner.body.watch(listener, executor)
	}

	fn unwatch(&self, id: ListenerId) -> bool {
		self.inner.body.unwatch(id)
	}

	/// Closes this watcher and detaches it from the parent. The parent and
	/// its other children are not affected.
	fn close(&self) {
		if self.inner.body.close() && self.inner.parent.unwatch(self.inner.subscription) {
			tracing::debug!(
				watcher = %self.inner.body.name(),
				parent = %self.inner.parent.name(),
				"detached from parent"
			);
		}
	}

	fn is_closed(&self) -> bool {
		self.inner.body.is_closed()
	}
}

impl<T, U> Debug for TransformingWatcher<T, U>
where
	T: Send + Sync + 'static,
	U: Debug + Send + Sync + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransformingWatcher")
			.field("name", &self.inner.body.name())
			.field("latest", &self.inner.body.latest().ok())
			.finish()
	}
}

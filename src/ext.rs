use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, WatchError};
use crate::executor::{self, Executor};
use crate::transform::TransformingWatcher;
use crate::{Latest, ListenerId, Revision, Watcher};

/// Conveniences built on top of the [`Watcher`] primitives.
pub trait WatcherExt<T>: Watcher<T> {
	/// Blocks until the initial value is available.
	///
	/// Fails with [`WatchError::Cancelled`] if the watcher is closed first.
	fn await_initial_value(&self) -> Result<Arc<Latest<T>>> {
		self.initial_value_future().wait()
	}

	/// Blocks until the initial value is available or `timeout` elapses.
	///
	/// A small timeout makes [`WatchError::Timeout`] more likely when the
	/// server is slow; see [`crate::RECOMMENDED_AWAIT_TIMEOUT`]. Consider
	/// [`WatcherExt::await_initial_value_or`] if a fallback is acceptable.
	fn await_initial_value_timeout(&self, timeout: Duration) -> Result<Arc<Latest<T>>> {
		self.initial_value_future().wait_timeout(timeout)
	}

	/// Like [`WatcherExt::await_initial_value_timeout`], but returns
	/// `default` instead of failing when the time runs out.
	fn await_initial_value_or(&self, timeout: Duration, default: T) -> Result<T>
	where
		T: Clone,
	{
		match self.await_initial_value_timeout(timeout) {
			Ok(latest) => Ok(latest.value().clone()),
			Err(WatchError::Timeout(_)) => Ok(default),
			Err(error) => Err(error),
		}
	}

	fn latest_value(&self) -> Result<T>
	where
		T: Clone,
	{
		Ok(self.latest()?.value().clone())
	}

	/// Returns the latest value, or `default` if there is none yet.
	fn latest_value_or(&self, default: T) -> T
	where
		T: Clone,
	{
		if !self.initial_value_future().is_done() {
			return default;
		}

		match self.latest() {
			Ok(latest) => latest.value().clone(),
			Err(_) => default,
		}
	}

	/// Registers a listener invoked on the delivering thread.
	fn watch<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(Revision, &T) + Send + Sync + 'static,
	{
		self.watch_with(Box::new(listener), executor::inline())
	}

	fn watch_value<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&T) + Send + Sync + 'static,
	{
		self.watch(move |_, value| listener(value))
	}

	fn watch_value_with<F>(&self, listener: F, executor: Arc<dyn Executor>) -> ListenerId
	where
		F: Fn(&T) + Send + Sync + 'static,
	{
		self.watch_with(Box::new(move |_: Revision, value: &T| listener(value)), executor)
	}

	/// Forks a watcher whose value is `transform` applied to this one.
	///
	/// The child is not notified when an update leaves the transformed
	/// value unchanged, and it does not have to be closed after use.
	fn new_child<U, F>(&self, transform: F) -> TransformingWatcher<T, U>
	where
		Self: Clone + Sized,
		T: Send + Sync + 'static,
		U: PartialEq + Send + Sync + 'static,
		F: Fn(&T) -> U + Send + Sync + 'static,
	{
		TransformingWatcher::new(Arc::new(self.clone()), "transform", move |value: &T| {
			Ok(transform(value))
		})
	}

	/// Forks a watcher with a fallible transformation. Updates for which
	/// `transform` fails are logged and skipped.
	fn try_new_child<U, F>(&self, transform: F) -> TransformingWatcher<T, U>
	where
		Self: Clone + Sized,
		T: Send + Sync + 'static,
		U: PartialEq + Send + Sync + 'static,
		F: Fn(&T) -> anyhow::Result<U> + Send + Sync + 'static,
	{
		TransformingWatcher::new(Arc::new(self.clone()), "transform", transform)
	}
}

impl<T, W> WatcherExt<T> for W where W: Watcher<T> + ?Sized {}

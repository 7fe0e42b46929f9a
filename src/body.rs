use std::sync::Arc;
use std::task::Waker;

use parking_lot::{Mutex, ReentrantMutex};

use crate::error::{Result, WatchError};
use crate::executor::Executor;
use crate::initial::{InitialCell, InitialValue};
use crate::registry::{Listener, ListenerId, Registry};
use crate::Latest;

/// State shared by every kind of watcher.
pub(crate) struct WatchBody<T> {
	name: String,
	initial: Arc<InitialCell<T>>,
	inner: Mutex<WatchInner<T>>,
	/// Held while an accepted update or a replay is handed to the
	/// listeners, so that update N is fully dispatched before update N + 1
	/// starts. Always taken before `inner` and before any registration
	/// lock. Reentrant because a listener may push into, or register on,
	/// the same watcher.
	delivery: ReentrantMutex<()>,
}

struct WatchInner<T> {
	latest: Option<Arc<Latest<T>>>,
	/// Number of accepted updates.
	seq: u64,
	closed: bool,
	registry: Registry<T>,
}

impl<T> WatchBody<T> {
	pub(crate) fn name(&self) -> &str {
		&self.name
	}
}

impl<T> WatchBody<T>
where
	T: Send + Sync + 'static,
{
	pub(crate) fn new(name: String) -> Self {
		WatchBody {
			name,
			initial: Arc::new(InitialCell::new()),
			inner: Mutex::new(WatchInner {
				latest: None,
				seq: 0,
				closed: false,
				registry: Registry::default(),
			}),
			delivery: ReentrantMutex::new(()),
		}
	}

	pub(crate) fn initial_value_future(&self) -> InitialValue<T> {
		InitialValue::new(self.initial.clone())
	}

	pub(crate) fn latest(&self) -> Result<Arc<Latest<T>>> {
		self.inner
			.lock()
			.latest
			.clone()
			.ok_or(WatchError::NotInitialized)
	}

	/// Offers a new state. `admit` sees the current state and the
	/// candidate and decides whether the candidate is accepted.
	pub(crate) fn accept(
		&self,
		next: Latest<T>,
		admit: impl FnOnce(Option<&Latest<T>>, &Latest<T>) -> bool,
	) -> bool {
		let _delivery = self.delivery.lock();

		let (seq, latest, listeners, wakers) = {
			let mut inner = self.inner.lock();
			if inner.closed || !admit(inner.latest.as_deref(), &next) {
				return false;
			}

			let latest = Arc::new(next);
			inner.seq += 1;
			inner.latest = Some(latest.clone());
			let wakers = self.initial.complete(latest.clone());
			if wakers.is_some() {
				tracing::debug!(watcher = %self.name, revision = %latest.revision(), "initialized");
			}

			(inner.seq, latest, inner.registry.snapshot(), wakers)
		};

		wakers.into_iter().flatten().for_each(Waker::wake);

		tracing::trace!(
			watcher = %self.name,
			revision = %latest.revision(),
			listeners = listeners.len(),
			"accepted update"
		);

		for registration in &listeners {
			registration.dispatch(seq, latest.clone());
		}

		true
	}

	pub(crate) fn watch(&self, listener: Listener<T>, executor: Arc<dyn Executor>) -> ListenerId {
		// The replay is a delivery like any other and takes the locks in
		// the same order as `accept`.
		let _delivery = self.delivery.lock();

		let (registration, replay) = {
			let mut inner = self.inner.lock();
			if inner.closed {
				let id = inner.registry.reserve();
				tracing::debug!(watcher = %self.name, listener = %id, "ignoring registration on a closed watcher");
				return id;
			}

			let registration = inner.registry.insert(listener, executor);
			let replay = inner.latest.clone().map(|latest| (inner.seq, latest));
			(registration, replay)
		};

		if let Some((seq, latest)) = replay {
			registration.dispatch(seq, latest);
		}

		registration.id()
	}

	pub(crate) fn unwatch(&self, id: ListenerId) -> bool {
		self.inner.lock().registry.remove(id).is_some()
	}

	/// Returns `true` for the call that actually closed the watcher.
	pub(crate) fn close(&self) -> bool {
		let mut inner = self.inner.lock();
		if inner.closed {
			return false;
		}

		inner.closed = true;
		let listeners = inner.registry.len();
		inner.registry.clear();
		let wakers = self.initial.abandon();
		std::mem::drop(inner);

		wakers.into_iter().for_each(Waker::wake);

		tracing::debug!(watcher = %self.name, listeners, "closed");
		true
	}

	pub(crate) fn is_closed(&self) -> bool {
		self.inner.lock().closed
	}
}

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use smallvec::SmallVec;

use crate::error::panic_message;
use crate::executor::Executor;
use crate::{Latest, Revision};

pub type Listener<T> = Box<dyn Fn(Revision, &T) + Send + Sync + 'static>;

/// Identifies one listener registration on one watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

pub(crate) struct Registration<T> {
	id: ListenerId,
	listener: Listener<T>,
	executor: Arc<dyn Executor>,
	active: AtomicBool,
	/// Sequence number of the last update handed to the listener. Held
	/// while the listener runs, so one listener is never invoked
	/// concurrently with itself.
	delivered: ReentrantMutex<Cell<u64>>,
}

impl<T> Registration<T>
where
	T: Send + Sync + 'static,
{
	pub(crate) fn id(&self) -> ListenerId {
		self.id
	}

	pub(crate) fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	/// Hands the update to the executor. The listener is skipped if the
	/// registration was removed in the meantime or if it already saw a
	/// newer update. A panicking listener is logged and does not keep the
	/// update from the other listeners.
	pub(crate) fn dispatch(self: &Arc<Self>, seq: u64, latest: Arc<Latest<T>>) {
		if !self.is_active() {
			return;
		}

		let this = self.clone();
		self.executor.execute(Box::new(move || {
			let delivered = this.delivered.lock();
			if !this.is_active() {
				return;
			}
			if delivered.get() >= seq {
				tracing::trace!(listener = %this.id, seq, "skipping stale delivery");
				return;
			}
			delivered.set(seq);

			let revision = latest.revision();
			let invoked = panic::catch_unwind(AssertUnwindSafe(|| (this.listener)(revision, latest.value())));
			if let Err(payload) = invoked {
				tracing::error!(
					listener = %this.id,
					%revision,
					panic = panic_message(&*payload),
					"listener panicked"
				);
			}
		}));
	}
}

/// Listener bookkeeping of a single watcher.
pub(crate) struct Registry<T> {
	next_id: u64,
	entries: SmallVec<[Arc<Registration<T>>; 4]>,
}

impl<T> Default for Registry<T> {
	fn default() -> Self {
		Registry {
			next_id: 0,
			entries: SmallVec::new(),
		}
	}
}

impl<T> Registry<T> {
	pub(crate) fn insert(
		&mut self,
		listener: Listener<T>,
		executor: Arc<dyn Executor>,
	) -> Arc<Registration<T>> {
		self.next_id += 1;
		let registration = Arc::new(Registration {
			id: ListenerId(self.next_id),
			listener,
			executor,
			active: AtomicBool::new(true),
			delivered: ReentrantMutex::new(Cell::new(0)),
		});
		self.entries.push(registration.clone());
		registration
	}

	/// Issues an id that was never registered, for registrations refused
	/// by a closed watcher.
	pub(crate) fn reserve(&mut self) -> ListenerId {
		self.next_id += 1;
		ListenerId(self.next_id)
	}

	pub(crate) fn remove(&mut self, id: ListenerId) -> Option<Arc<Registration<T>>> {
		let index = self.entries.iter().position(|r| r.id == id)?;
		let registration = self.entries.remove(index);
		registration.active.store(false, Ordering::Release);
		Some(registration)
	}

	pub(crate) fn snapshot(&self) -> SmallVec<[Arc<Registration<T>>; 4]> {
		self.entries.clone()
	}

	/// Deactivates and drops every registration.
	pub(crate) fn clear(&mut self) {
		for registration in self.entries.drain(..) {
			registration.active.store(false, Ordering::Release);
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

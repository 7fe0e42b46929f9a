use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use crate::error::{Result, WatchError};
use crate::Latest;

pub(crate) type Wakers = SmallVec<[Waker; 2]>;

enum Slot<T> {
	Pending(Wakers),
	Set(Arc<Latest<T>>),
	/// The watcher was closed while the slot was still pending.
	/// The slot never leaves this state.
	Abandoned,
}

pub(crate) struct InitialCell<T> {
	slot: Mutex<Slot<T>>,
	ready: Condvar,
}

impl<T> InitialCell<T> {
	pub(crate) fn new() -> Self {
		InitialCell {
			slot: Mutex::new(Slot::Pending(SmallVec::new())),
			ready: Condvar::new(),
		}
	}

	/// Fills the slot if it is still pending. Blocked threads are
	/// released right away, the returned wakers are left to the caller.
	pub(crate) fn complete(&self, latest: Arc<Latest<T>>) -> Option<Wakers> {
		let mut slot = self.slot.lock();
		let Slot::Pending(wakers) = &mut *slot else {
			return None;
		};

		let wakers = std::mem::take(wakers);
		*slot = Slot::Set(latest);
		std::mem::drop(slot);

		self.ready.notify_all();
		Some(wakers)
	}

	pub(crate) fn abandon(&self) -> Wakers {
		let mut slot = self.slot.lock();
		let Slot::Pending(wakers) = &mut *slot else {
			return Wakers::new();
		};

		let wakers = std::mem::take(wakers);
		*slot = Slot::Abandoned;
		std::mem::drop(slot);

		self.ready.notify_all();
		wakers
	}
}

/// A handle to the one-time completion of the first value of a watcher.
///
/// Every handle obtained from the same watcher observes the same event.
/// The handle is never completed with an error: closing the watcher
/// before the first value arrived leaves it pending forever, and the
/// waiting methods report that as [`WatchError::Cancelled`].
pub struct InitialValue<T> {
	cell: Arc<InitialCell<T>>,
}

impl<T> Clone for InitialValue<T> {
	fn clone(&self) -> Self {
		Self {
			cell: self.cell.clone(),
		}
	}
}

impl<T> InitialValue<T> {
	pub(crate) fn new(cell: Arc<InitialCell<T>>) -> Self {
		InitialValue { cell }
	}

	/// Returns `true` once the first value has been accepted.
	pub fn is_done(&self) -> bool {
		matches!(*self.cell.slot.lock(), Slot::Set(_))
	}

	pub fn get(&self) -> Option<Arc<Latest<T>>> {
		match &*self.cell.slot.lock() {
			Slot::Set(latest) => Some(latest.clone()),
			_ => None,
		}
	}

	/// Blocks the current thread until the first value is available.
	pub fn wait(&self) -> Result<Arc<Latest<T>>> {
		let mut slot = self.cell.slot.lock();
		loop {
			match &*slot {
				Slot::Set(latest) => return Ok(latest.clone()),
				Slot::Abandoned => return Err(WatchError::Cancelled),
				Slot::Pending(_) => self.cell.ready.wait(&mut slot),
			}
		}
	}

	/// Same as [`InitialValue::wait`], but gives up after `timeout`.
	pub fn wait_timeout(&self, timeout: Duration) -> Result<Arc<Latest<T>>> {
		let deadline = Instant::now().checked_add(timeout);
		let mut slot = self.cell.slot.lock();
		loop {
			match &*slot {
				Slot::Set(latest) => return Ok(latest.clone()),
				Slot::Abandoned => return Err(WatchError::Cancelled),
				Slot::Pending(_) => match deadline {
					Some(deadline) => {
						if self.cell.ready.wait_until(&mut slot, deadline).timed_out() {
							return match &*slot {
								Slot::Set(latest) => Ok(latest.clone()),
								Slot::Abandoned => Err(WatchError::Cancelled),
								Slot::Pending(_) => Err(WatchError::Timeout(timeout)),
							};
						}
					}
					// Too far in the future to represent.
					None => self.cell.ready.wait(&mut slot),
				},
			}
		}
	}
}

impl<T> Future for InitialValue<T> {
	type Output = Result<Arc<Latest<T>>>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut slot = self.cell.slot.lock();
		match &mut *slot {
			Slot::Set(latest) => Poll::Ready(Ok(latest.clone())),
			Slot::Abandoned => Poll::Ready(Err(WatchError::Cancelled)),
			Slot::Pending(wakers) => {
				if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
					wakers.push(cx.waker().clone());
				}
				Poll::Pending
			}
		}
	}
}

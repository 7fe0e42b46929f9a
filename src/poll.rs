use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::panic_message;
use crate::{Latest, Revision, RootWatcher, Watcher};

/// How often a sleeping poller checks whether its watcher was closed.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// The transport side of a root watcher.
///
/// `fetch` resolves the current value of the watched entry. It may block
/// for as long as the server holds the long poll. `Ok(None)` means that
/// nothing changed since `last_known`.
pub trait Fetch<T>: Send + 'static {
	fn fetch(&mut self, last_known: Option<Revision>) -> anyhow::Result<Option<Latest<T>>>;
}

impl<T, F> Fetch<T> for F
where
	F: FnMut(Option<Revision>) -> anyhow::Result<Option<Latest<T>>> + Send + 'static,
{
	fn fetch(&mut self, last_known: Option<Revision>) -> anyhow::Result<Option<Latest<T>>> {
		self(last_known)
	}
}

/// Re-poll behaviour of a [`Poller`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
	/// Pause after a successful fetch.
	pub delay: Duration,
	/// First pause after a failed fetch.
	pub min_backoff: Duration,
	/// Upper bound of the pause after consecutive failures.
	pub max_backoff: Duration,
	/// Growth factor of the pause for each consecutive failure.
	pub multiplier: f64,
}

impl Default for PollConfig {
	fn default() -> Self {
		PollConfig {
			delay: Duration::from_secs(1),
			min_backoff: Duration::from_secs(1),
			max_backoff: Duration::from_secs(60),
			multiplier: 2.0,
		}
	}
}

impl PollConfig {
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
		self.min_backoff = min;
		self.max_backoff = max.max(min);
		self
	}

	pub fn with_multiplier(mut self, multiplier: f64) -> Self {
		self.multiplier = multiplier.max(1.0);
		self
	}

	/// Pause after a failure, given the pause after the previous one.
	pub fn next_backoff(&self, previous: Option<Duration>) -> Duration {
		match previous {
			None => self.min_backoff,
			Some(previous) => {
				Duration::try_from_secs_f64(previous.as_secs_f64() * self.multiplier)
					.unwrap_or(self.max_backoff)
					.min(self.max_backoff)
					.max(self.min_backoff)
			}
		}
	}
}

#[derive(Default)]
struct StopSignal {
	stopped: Mutex<bool>,
	wake: Condvar,
}

impl StopSignal {
	fn stop(&self) {
		*self.stopped.lock() = true;
		self.wake.notify_all();
	}

	fn is_stopped(&self) -> bool {
		*self.stopped.lock()
	}

	/// Sleeps for `duration`, waking up every [`CANCEL_CHECK_INTERVAL`] to
	/// ask `cancelled`. Returns `true` if the loop should end.
	fn sleep(&self, duration: Duration, cancelled: impl Fn() -> bool) -> bool {
		let deadline = Instant::now().checked_add(duration);
		let mut stopped = self.stopped.lock();
		loop {
			if *stopped || cancelled() {
				return true;
			}

			let now = Instant::now();
			let slice = match deadline {
				Some(deadline) if now >= deadline => return false,
				Some(deadline) => (deadline - now).min(CANCEL_CHECK_INTERVAL),
				None => CANCEL_CHECK_INTERVAL,
			};
			self.wake.wait_for(&mut stopped, slice);
		}
	}
}

/// Drives a [`Fetch`] implementation on a background thread and pushes
/// whatever it resolves into a root watcher.
///
/// The loop ends when the watcher is closed or the poller is stopped or
/// dropped. A failing or panicking fetch is logged and retried with
/// backoff.
pub struct Poller {
	signal: Arc<StopSignal>,
	handle: Option<JoinHandle<()>>,
}

impl Poller {
	pub fn spawn<T, F>(watcher: RootWatcher<T>, fetcher: F, config: PollConfig) -> std::io::Result<Self>
	where
		T: Send + Sync + 'static,
		F: Fetch<T>,
	{
		let signal = Arc::new(StopSignal::default());
		let handle = std::thread::Builder::new()
			.name(format!("revwatch-poll-{}", watcher.name()))
			.spawn({
				let signal = signal.clone();
				move || run(watcher, fetcher, config, &signal)
			})?;

		Ok(Poller {
			signal,
			handle: Some(handle),
		})
	}

	/// Stops the loop and waits for the current fetch to return.
	pub fn stop(&mut self) {
		self.signal.stop();
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				tracing::error!("poller thread panicked");
			}
		}
	}

	pub fn is_running(&self) -> bool {
		self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
	}
}

impl Drop for Poller {
	fn drop(&mut self) {
		self.stop();
	}
}

fn run<T, F>(watcher: RootWatcher<T>, mut fetcher: F, config: PollConfig, signal: &StopSignal)
where
	T: Send + Sync + 'static,
	F: Fetch<T>,
{
	let mut backoff = None;

	while !signal.is_stopped() && !watcher.is_closed() {
		let last_known = watcher.latest().ok().map(|latest| latest.revision());

		let polled = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<()> {
			if let Some(latest) = fetcher.fetch(last_known)? {
				watcher.push_latest(latest);
			}
			Ok(())
		}))
		.unwrap_or_else(|payload| Err(anyhow::anyhow!("poll panicked: {}", panic_message(&*payload))));

		let pause = match polled {
			Ok(()) => {
				backoff = None;
				config.delay
			}
			Err(error) => {
				let pause = config.next_backoff(backoff);
				backoff = Some(pause);
				tracing::warn!(
					watcher = %watcher.name(),
					error = %format_args!("{error:#}"),
					retry_in = ?pause,
					"failed to fetch the latest value"
				);
				pause
			}
		};

		if signal.sleep(pause, || watcher.is_closed()) {
			break;
		}
	}

	tracing::debug!(watcher = %watcher.name(), "poller finished");
}

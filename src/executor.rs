use std::sync::Arc;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run listener invocations.
///
/// Tasks handed to an executor by a single watcher are handed over in
/// the order the watcher accepted the updates. Whether they also run in
/// that order is up to the executor.
pub trait Executor: Send + Sync + 'static {
	fn execute(&self, task: Task);
}

/// Runs every task right away on the thread that delivered the update.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Executor for Inline {
	#[inline]
	fn execute(&self, task: Task) {
		task()
	}
}

/// Runs every task on a freshly spawned thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Spawn;

impl Executor for Spawn {
	fn execute(&self, task: Task) {
		if let Err(error) = std::thread::Builder::new()
			.name("revwatch-listener".into())
			.spawn(task)
		{
			tracing::error!(%error, "failed to spawn a listener thread");
		}
	}
}

impl<F> Executor for F
where
	F: Fn(Task) + Send + Sync + 'static,
{
	fn execute(&self, task: Task) {
		self(task)
	}
}

#[cfg(feature = "tokio")]
impl Executor for tokio::runtime::Handle {
	fn execute(&self, task: Task) {
		self.spawn_blocking(task);
	}
}

pub(crate) fn inline() -> Arc<dyn Executor> {
	Arc::new(Inline)
}

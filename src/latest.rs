use std::fmt::Debug;

use crate::Revision;

/// The most recently observed value of a watched entry together with
/// the revision it came from.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Latest<T> {
	revision: Revision,
	value: T,
}

impl<T> Latest<T> {
	pub fn new(revision: Revision, value: T) -> Self {
		Latest { revision, value }
	}

	#[inline]
	pub fn revision(&self) -> Revision {
		self.revision
	}

	#[inline]
	pub fn value(&self) -> &T {
		&self.value
	}

	pub fn into_value(self) -> T {
		self.value
	}
}

impl<T> Debug for Latest<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Latest")
			.field("revision", &self.revision)
			.field("value", &self.value)
			.finish()
	}
}

use std::fmt;

/// A point in the history of a watched repository.
///
/// Revisions are produced by the transport and are only ever compared
/// by the watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(i64);

impl Revision {
	#[inline]
	pub const fn new(major: i64) -> Self {
		Revision(major)
	}

	#[inline]
	pub const fn major(&self) -> i64 {
		self.0
	}
}

impl From<i64> for Revision {
	fn from(major: i64) -> Self {
		Revision(major)
	}
}

impl fmt::Display for Revision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "r{}", self.0)
	}
}

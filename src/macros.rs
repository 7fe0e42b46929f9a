pub use enclose::*;

/// Builds a listener closure, optionally capturing clones of the listed
/// variables.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use revwatch::{listener, Revision, RootWatcher, WatcherExt};
///
/// let watcher = RootWatcher::new("counter");
/// let calls = Arc::new(AtomicUsize::new(0));
///
/// watcher.watch(listener!((calls) _revision, _value: &u32 => {
///     calls.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// watcher.push(Revision::new(1), 7);
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[macro_export]
macro_rules! listener {
    (( $($d_tt:tt)* ) $rev:ident, $value:ident : $ty:ty => $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move |$rev: $crate::Revision, $value: $ty| { $($b)* })
    };
    ($rev:ident, $value:ident : $ty:ty => $($b:tt)*) => {
        move |$rev: $crate::Revision, $value: $ty| { $($b)* }
    };
}

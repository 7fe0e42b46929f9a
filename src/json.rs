use serde_json::Value;

use crate::error::{Result, WatchError};
use crate::{TransformingWatcher, Watcher};

/// Values that can be addressed with a JSON pointer. `None` means the
/// node is missing.
pub trait AsJson {
	fn as_json(&self) -> Option<&Value>;
}

impl AsJson for Value {
	fn as_json(&self) -> Option<&Value> {
		Some(self)
	}
}

impl AsJson for Option<Value> {
	fn as_json(&self) -> Option<&Value> {
		self.as_ref()
	}
}

/// Forks a watcher whose value is the node addressed by an RFC 6901
/// `pointer`.
///
/// The child holds `None` while the node is missing, which is distinct
/// from a present JSON `null`. Changes elsewhere in the document do not
/// reach the child's listeners.
pub fn at_json_pointer<T, W>(
	watcher: &W,
	pointer: impl Into<String>,
) -> Result<TransformingWatcher<T, Option<Value>>>
where
	T: AsJson + Send + Sync + 'static,
	W: Watcher<T> + Clone,
{
	let pointer = pointer.into();
	if !pointer.is_empty() && !pointer.starts_with('/') {
		return Err(WatchError::InvalidJsonPointer(pointer));
	}

	let label = format!("JSON pointer {pointer}");
	Ok(TransformingWatcher::new(
		std::sync::Arc::new(watcher.clone()),
		&label,
		move |node: &T| Ok(node.as_json().and_then(|node| node.pointer(&pointer)).cloned()),
	))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::{Revision, RootWatcher, WatcherExt};

	#[test]
	fn rejects_relative_pointer() {
		let root = RootWatcher::<Value>::new("doc");
		let error = at_json_pointer(&root, "a/b").unwrap_err();
		assert_eq!(error, WatchError::InvalidJsonPointer("a/b".into()));
	}

	#[test]
	fn empty_pointer_is_the_whole_document() {
		let root = RootWatcher::new("doc");
		let child = at_json_pointer(&root, "").unwrap();
		root.push(Revision::new(1), json!({"a": 1}));
		assert_eq!(child.latest_value().unwrap(), Some(json!({"a": 1})));
	}

	#[test]
	fn missing_is_not_null() {
		let root = RootWatcher::new("doc");
		let present = at_json_pointer(&root, "/a").unwrap();
		let missing = at_json_pointer(&root, "/b").unwrap();
		root.push(Revision::new(1), json!({"a": null}));

		assert_eq!(present.latest_value().unwrap(), Some(Value::Null));
		assert_eq!(missing.latest_value().unwrap(), None);
	}

	#[test]
	fn chains_through_optional_nodes() {
		let root = RootWatcher::new("doc");
		let outer = at_json_pointer(&root, "/server").unwrap();
		let port = at_json_pointer(&outer, "/port").unwrap();

		root.push(Revision::new(1), json!({"server": {"port": 8080}}));
		assert_eq!(port.latest_value().unwrap(), Some(json!(8080)));

		root.push(Revision::new(2), json!({"client": {}}));
		assert_eq!(outer.latest_value().unwrap(), None);
		assert_eq!(port.latest_value().unwrap(), None);
		assert_eq!(port.latest().unwrap().revision(), Revision::new(2));
	}
}

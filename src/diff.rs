//! Host node creation and the property diff applied to updated host nodes.

use crate::{
	host::{HostError, HostKind, HostRenderer},
	node::{AttrValue, Props, Tag, VirtualNode, HANDLER_PREFIX},
};
use tracing::{instrument, trace};

/// Derives the host event name from a handler key: `onClick` becomes `click`.
#[must_use]
pub fn event_name(key: &str) -> String {
	key.strip_prefix(HANDLER_PREFIX).unwrap_or(key).to_lowercase()
}

/// Creates a detached host node for an element or text node and populates all of its properties.
///
/// Returns [`None`] for component nodes, which have no host node of their own.
#[instrument(skip(host, node), fields(tag = ?node.tag()))]
pub(crate) fn create_node<H: HostRenderer>(host: &mut H, node: &VirtualNode) -> Result<Option<H::Node>, HostError> {
	let kind = match node.tag() {
		Tag::Element(name) => HostKind::Element(name),
		Tag::Text => HostKind::Text,
		Tag::Component(_) => return Ok(None),
	};
	let handle = host.create_node(kind)?;
	let mut applied = 0;
	update_node(host, &handle, &Props::default(), node.props(), &mut applied)?;
	trace!(applied, "Created host node.");
	Ok(Some(handle))
}

/// Applies the difference between `previous` and `next` to `node`.
///
/// In order: stale handlers are removed, attributes missing from `next` are cleared,
/// new and changed attributes are set, and new and changed handlers are added.
/// Removing before adding means a handler swapped under the same key is never registered twice.
///
/// `applied` counts successful host calls, including those made before a failure.
pub(crate) fn update_node<H: HostRenderer>(host: &mut H, node: &H::Node, previous: &Props, next: &Props, applied: &mut usize) -> Result<(), HostError> {
	for (key, handler) in previous.handlers() {
		if next.handler(key).map_or(true, |next| !next.ptr_eq(handler)) {
			let event = event_name(key);
			trace!(event = %event, "Removing listener.");
			host.remove_listener(node, &event, handler)?;
			*applied += 1;
		}
	}

	for key in previous.attributes().keys() {
		if !next.attributes().contains_key(key) {
			trace!(key = %key, "Clearing attribute.");
			host.clear_attribute(node, key)?;
			*applied += 1;
		}
	}

	for (key, value) in next.attributes() {
		if previous.attribute(key) != Some(value) {
			trace_set(key, value);
			host.set_attribute(node, key, value)?;
			*applied += 1;
		}
	}

	for (key, handler) in next.handlers() {
		if previous.handler(key).map_or(true, |previous| !previous.ptr_eq(handler)) {
			let event = event_name(key);
			trace!(event = %event, "Adding listener.");
			host.add_listener(node, &event, handler)?;
			*applied += 1;
		}
	}

	Ok(())
}

fn trace_set(key: &str, value: &AttrValue) {
	if cfg!(feature = "dangerous-logging") {
		trace!(key, value = %value, "Setting attribute.");
	} else {
		trace!(key, "Setting attribute.");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		memory::{HostOp, MemoryHost},
		node::{element, Handler},
	};

	#[test]
	fn event_names() {
		assert_eq!(event_name("onClick"), "click");
		assert_eq!(event_name("onMouseMove"), "mousemove");
		assert_eq!(event_name("Custom"), "custom");
	}

	#[test]
	fn identical_props_do_nothing() {
		let mut host = MemoryHost::new();
		let props = element("a").attr("href", "#").on("onClick", |_| ()).build();
		let node = create_node(&mut host, &props).unwrap().unwrap();
		host.take_ops();

		let mut applied = 0;
		update_node(&mut host, &node, props.props(), props.props(), &mut applied).unwrap();
		assert_eq!(applied, 0);
		assert!(host.ops().is_empty());
	}

	#[test]
	fn handler_swap_removes_before_adding() {
		let mut host = MemoryHost::new();
		let h1 = Handler::new(|_| ());
		let h2 = Handler::new(|_| ());
		let previous = element("button").prop("onClick", h1).attr("title", "old").attr("id", "b").build();
		let next = element("button").prop("onClick", h2).attr("id", "b").attr("disabled", true).build();
		let node = create_node(&mut host, &previous).unwrap().unwrap();
		host.take_ops();

		let mut applied = 0;
		update_node(&mut host, &node, previous.props(), next.props(), &mut applied).unwrap();

		assert_eq!(
			host.take_ops(),
			[
				HostOp::RemoveListener { node, event: "click".into() },
				HostOp::ClearAttribute { node, key: "title".into() },
				HostOp::SetAttribute {
					node,
					key: "disabled".into(),
					value: true.into()
				},
				HostOp::AddListener { node, event: "click".into() },
			]
		);
		assert_eq!(applied, 4);
		assert_eq!(host.listener_count(node, "click"), 1);
	}
}

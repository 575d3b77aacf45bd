//! A headless host that keeps its tree in memory and records every operation.
//!
//! Useful for tests, for server-side output through [`MemoryHost::markup`],
//! and as a reference for what the engine expects from a [`HostRenderer`].

use crate::{
	host::{HostError, HostKind, HostRenderer},
	node::{AttrValue, Event, Handler, TEXT_VALUE_KEY},
};
use hashbrown::HashMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A recorded host operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
	Create { node: NodeId, kind: String },
	SetAttribute { node: NodeId, key: String, value: AttrValue },
	ClearAttribute { node: NodeId, key: String },
	AddListener { node: NodeId, event: String },
	RemoveListener { node: NodeId, event: String },
	AppendChild { parent: NodeId, child: NodeId },
	RemoveChild { parent: NodeId, child: NodeId },
}

#[derive(Debug)]
enum MemoryKind {
	Container,
	Element(String),
	Text,
}

#[derive(Debug)]
struct MemoryNode {
	kind: MemoryKind,
	attributes: HashMap<String, AttrValue>,
	listeners: Vec<(String, Handler)>,
	children: Vec<NodeId>,
	parent: Option<NodeId>,
}

impl MemoryNode {
	fn new(kind: MemoryKind) -> Self {
		Self {
			kind,
			attributes: HashMap::new(),
			listeners: Vec::new(),
			children: Vec::new(),
			parent: None,
		}
	}
}

/// Node storage only grows. Removed nodes and nodes that were never attached stay allocated
/// (and keep their [`NodeId`]) until the host is dropped.
#[derive(Debug)]
pub struct MemoryHost {
	nodes: Vec<MemoryNode>,
	ops: Vec<HostOp>,
	fail_next: Option<&'static str>,
}

impl Default for MemoryHost {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryHost {
	/// Creates a host with an empty container node, see [`MemoryHost::container`].
	#[must_use]
	pub fn new() -> Self {
		Self {
			nodes: vec![MemoryNode::new(MemoryKind::Container)],
			ops: Vec::new(),
			fail_next: None,
		}
	}

	/// The container to render into.
	#[must_use]
	pub fn container(&self) -> NodeId {
		NodeId(0)
	}

	#[must_use]
	pub fn ops(&self) -> &[HostOp] {
		&self.ops
	}

	pub fn take_ops(&mut self) -> Vec<HostOp> {
		core::mem::take(&mut self.ops)
	}

	/// Makes the next call of `operation` (named like the [`HostRenderer`] method) fail.
	pub fn fail_next(&mut self, operation: &'static str) {
		self.fail_next = Some(operation);
	}

	/// Serializes the container's children.
	#[must_use]
	pub fn markup(&self) -> String {
		self.markup_of(self.container())
	}

	/// Serializes `node`, or only its children if it's the container.
	#[must_use]
	pub fn markup_of(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.write_markup(node, &mut out);
		out
	}

	fn write_markup(&self, id: NodeId, out: &mut String) {
		let Some(node) = self.nodes.get(id.0) else { return };
		match &node.kind {
			MemoryKind::Container => {
				for &child in &node.children {
					self.write_markup(child, out);
				}
			}
			MemoryKind::Text => {
				if let Some(value) = node.attributes.get(TEXT_VALUE_KEY) {
					out.push_str(&value.to_string());
				}
			}
			MemoryKind::Element(tag) => {
				let mut attributes: Vec<_> = node.attributes.iter().collect();
				attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
				out.push('<');
				out.push_str(tag);
				for (key, value) in attributes {
					out.push(' ');
					out.push_str(key);
					out.push_str("=\"");
					out.push_str(&value.to_string());
					out.push('"');
				}
				out.push('>');
				for &child in &node.children {
					self.write_markup(child, out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}

	/// The first element with tag `tag` in document order, starting at the container.
	#[must_use]
	pub fn find_element(&self, tag: &str) -> Option<NodeId> {
		let mut stack = vec![self.container()];
		while let Some(id) = stack.pop() {
			let node = &self.nodes[id.0];
			if matches!(&node.kind, MemoryKind::Element(t) if t == tag) {
				return Some(id);
			}
			stack.extend(node.children.iter().rev());
		}
		None
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		self.nodes.get(node.0).map_or(&[][..], |node| node.children.as_slice())
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, key: &str) -> Option<&AttrValue> {
		self.nodes.get(node.0)?.attributes.get(key)
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
		self.nodes.get(node.0).map_or(0, |node| node.listeners.iter().filter(|(e, _)| e == event).count())
	}

	/// Fires `event` at `node` only, without bubbling. Returns how many handlers ran.
	///
	/// # Errors
	///
	/// Iff `node` doesn't exist.
	pub fn dispatch(&self, node: NodeId, event: &Event) -> Result<usize, HostError> {
		let target = self.node(node, "dispatch")?;
		let mut count = 0;
		for (name, handler) in &target.listeners {
			if name == event.name() {
				handler.call(event);
				count += 1;
			}
		}
		trace!(?node, event = event.name(), count, "Dispatched event.");
		Ok(count)
	}

	fn check(&mut self, operation: &'static str) -> Result<(), HostError> {
		if self.fail_next == Some(operation) {
			self.fail_next = None;
			return Err(HostError::new(operation, "injected failure"));
		}
		Ok(())
	}

	fn node(&self, id: NodeId, operation: &'static str) -> Result<&MemoryNode, HostError> {
		self.nodes.get(id.0).ok_or_else(|| HostError::new(operation, format!("unknown node {id:?}")))
	}

	fn node_mut(&mut self, id: NodeId, operation: &'static str) -> Result<&mut MemoryNode, HostError> {
		self.nodes.get_mut(id.0).ok_or_else(|| HostError::new(operation, format!("unknown node {id:?}")))
	}

	fn detach(&mut self, child: NodeId) {
		if let Some(parent) = self.nodes[child.0].parent.take() {
			self.nodes[parent.0].children.retain(|&c| c != child);
		}
	}
}

impl HostRenderer for MemoryHost {
	type Node = NodeId;

	fn create_node(&mut self, kind: HostKind<'_>) -> Result<NodeId, HostError> {
		self.check("create_node")?;
		let (kind, name) = match kind {
			HostKind::Element(tag) => (MemoryKind::Element(tag.to_owned()), tag.to_owned()),
			HostKind::Text => (MemoryKind::Text, "#text".to_owned()),
		};
		let node = NodeId(self.nodes.len());
		self.nodes.push(MemoryNode::new(kind));
		self.ops.push(HostOp::Create { node, kind: name });
		Ok(node)
	}

	fn set_attribute(&mut self, node: &NodeId, key: &str, value: &AttrValue) -> Result<(), HostError> {
		self.check("set_attribute")?;
		self.node_mut(*node, "set_attribute")?.attributes.insert(key.to_owned(), value.clone());
		self.ops.push(HostOp::SetAttribute {
			node: *node,
			key: key.to_owned(),
			value: value.clone(),
		});
		Ok(())
	}

	fn clear_attribute(&mut self, node: &NodeId, key: &str) -> Result<(), HostError> {
		self.check("clear_attribute")?;
		self.node_mut(*node, "clear_attribute")?.attributes.remove(key);
		self.ops.push(HostOp::ClearAttribute { node: *node, key: key.to_owned() });
		Ok(())
	}

	fn add_listener(&mut self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), HostError> {
		self.check("add_listener")?;
		let target = self.node_mut(*node, "add_listener")?;
		if target.listeners.iter().any(|(e, h)| e == event && h.ptr_eq(handler)) {
			return Err(HostError::new("add_listener", format!("{event:?} listener registered twice")));
		}
		target.listeners.push((event.to_owned(), handler.clone()));
		self.ops.push(HostOp::AddListener { node: *node, event: event.to_owned() });
		Ok(())
	}

	fn remove_listener(&mut self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), HostError> {
		self.check("remove_listener")?;
		let target = self.node_mut(*node, "remove_listener")?;
		let index = target
			.listeners
			.iter()
			.position(|(e, h)| e == event && h.ptr_eq(handler))
			.ok_or_else(|| HostError::new("remove_listener", format!("no such {event:?} listener")))?;
		target.listeners.remove(index);
		self.ops.push(HostOp::RemoveListener { node: *node, event: event.to_owned() });
		Ok(())
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
		self.check("append_child")?;
		self.node(*child, "append_child")?;
		if matches!(self.node(*parent, "append_child")?.kind, MemoryKind::Text) {
			return Err(HostError::new("append_child", "text nodes can't have children"));
		}
		self.detach(*child);
		self.nodes[parent.0].children.push(*child);
		self.nodes[child.0].parent = Some(*parent);
		self.ops.push(HostOp::AppendChild { parent: *parent, child: *child });
		Ok(())
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
		self.check("remove_child")?;
		if self.node(*child, "remove_child")?.parent != Some(*parent) {
			return Err(HostError::new("remove_child", format!("{child:?} isn't a child of {parent:?}")));
		}
		self.detach(*child);
		self.ops.push(HostOp::RemoveChild { parent: *parent, child: *child });
		Ok(())
	}
}

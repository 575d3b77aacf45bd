//! The capability through which the engine mutates the externally owned host tree.

use crate::node::{AttrValue, Handler};
use core::fmt::Debug;
use thiserror::Error;

/// The kind of host node to create for an element or text fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind<'a> {
	Element(&'a str),
	Text,
}

#[derive(Debug, Clone, Error)]
#[error("host operation `{operation}` failed: {reason}")]
pub struct HostError {
	operation: &'static str,
	reason: String,
}

impl HostError {
	pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
		Self { operation, reason: reason.into() }
	}

	#[must_use]
	pub fn operation(&self) -> &'static str {
		self.operation
	}

	#[must_use]
	pub fn reason(&self) -> &str {
		&self.reason
	}
}

/// A mutable output tree, like a DOM, a terminal buffer or a native widget tree.
///
/// Text nodes receive their content as the [`TEXT_VALUE_KEY`](crate::node::TEXT_VALUE_KEY) attribute.
/// Event names are handler keys without their `on` prefix, lower-cased.
pub trait HostRenderer {
	/// A handle to a host node. Cloning it must not clone the node.
	type Node: Clone + Debug;

	/// Allocates a detached node.
	///
	/// # Errors
	///
	/// Iff the host can't create the node.
	fn create_node(&mut self, kind: HostKind<'_>) -> Result<Self::Node, HostError>;

	/// # Errors
	///
	/// Iff the host rejects the attribute.
	fn set_attribute(&mut self, node: &Self::Node, key: &str, value: &AttrValue) -> Result<(), HostError>;

	/// Resets an attribute to its empty or default value.
	///
	/// # Errors
	///
	/// Iff the host rejects the change.
	fn clear_attribute(&mut self, node: &Self::Node, key: &str) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the listener can't be registered.
	fn add_listener(&mut self, node: &Self::Node, event: &str, handler: &Handler) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the listener can't be removed, for example because it isn't registered.
	fn remove_listener(&mut self, node: &Self::Node, event: &str, handler: &Handler) -> Result<(), HostError>;

	/// Appends `child` as last child of `parent`.
	///
	/// # Errors
	///
	/// Iff the host rejects the insertion.
	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff `child` isn't a child of `parent` or the host rejects the removal.
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
}

//! The shadow tree the reconciler builds and the committer applies.
//!
//! Fibers of the current tree and of the work-in-progress tree live in one arena.
//! Edges are [`FiberId`]s: `first_child` and `next_sibling` form the tree, `parent` and `host_parent`
//! point upwards, and `alternate` points from a work-in-progress fiber to the fiber at the same position
//! in the current tree. After each commit, fibers outside the new current tree are removed.

use crate::{
	hooks::StateCell,
	node::{Tag, VirtualNode},
};
use core::ops::{Index, IndexMut};
use hashbrown::HashSet;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
	/// Identifies a fiber in an [`Engine`](crate::Engine). Stale ids resolve to nothing.
	pub struct FiberId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberKind {
	/// Wraps the host container passed to [`Engine::render`](crate::Engine::render).
	Root,
	Element,
	Text,
	Component,
}

impl FiberKind {
	fn of(tag: &Tag) -> Self {
		match tag {
			Tag::Element(_) => FiberKind::Element,
			Tag::Text => FiberKind::Text,
			Tag::Component(_) => FiberKind::Component,
		}
	}

	/// Whether fibers of this kind own a host node.
	#[must_use]
	pub fn is_host(self) -> bool {
		!matches!(self, FiberKind::Component)
	}
}

/// The mutation a fiber needs at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
	None,
	Placement,
	Update,
	Deletion,
}

#[derive(Debug)]
pub struct Fiber<N> {
	pub(crate) kind: FiberKind,
	pub(crate) node: VirtualNode,
	pub(crate) parent: Option<FiberId>,
	pub(crate) first_child: Option<FiberId>,
	pub(crate) next_sibling: Option<FiberId>,
	/// Nearest ancestor that owns a host node, cached when the fiber is reconciled.
	pub(crate) host_parent: Option<FiberId>,
	pub(crate) host_node: Option<N>,
	pub(crate) alternate: Option<FiberId>,
	pub(crate) effect: Effect,
	pub(crate) cells: Vec<StateCell>,
}

impl<N> Fiber<N> {
	pub(crate) fn root(node: VirtualNode, host_node: N, alternate: Option<FiberId>) -> Self {
		Self {
			kind: FiberKind::Root,
			node,
			parent: None,
			first_child: None,
			next_sibling: None,
			host_parent: None,
			host_node: Some(host_node),
			alternate,
			effect: Effect::None,
			cells: Vec::new(),
		}
	}

	pub(crate) fn placement(node: VirtualNode, parent: FiberId, host_parent: Option<FiberId>) -> Self {
		Self {
			kind: FiberKind::of(node.tag()),
			node,
			parent: Some(parent),
			first_child: None,
			next_sibling: None,
			host_parent,
			host_node: None,
			alternate: None,
			effect: Effect::Placement,
			cells: Vec::new(),
		}
	}

	pub(crate) fn update(node: VirtualNode, parent: FiberId, host_parent: Option<FiberId>, alternate: FiberId, host_node: Option<N>) -> Self {
		Self {
			kind: FiberKind::of(node.tag()),
			node,
			parent: Some(parent),
			first_child: None,
			next_sibling: None,
			host_parent,
			host_node,
			alternate: Some(alternate),
			effect: Effect::Update,
			cells: Vec::new(),
		}
	}

	#[must_use]
	pub fn kind(&self) -> FiberKind {
		self.kind
	}

	/// The virtual node this fiber was reconciled from in its render pass.
	#[must_use]
	pub fn node(&self) -> &VirtualNode {
		&self.node
	}

	#[must_use]
	pub fn parent(&self) -> Option<FiberId> {
		self.parent
	}

	#[must_use]
	pub fn first_child(&self) -> Option<FiberId> {
		self.first_child
	}

	#[must_use]
	pub fn next_sibling(&self) -> Option<FiberId> {
		self.next_sibling
	}

	/// The fiber at the same position in the previous tree. Cleared once this fiber is committed.
	#[must_use]
	pub fn alternate(&self) -> Option<FiberId> {
		self.alternate
	}

	/// Meaningful only between reconciliation and commit.
	#[must_use]
	pub fn effect(&self) -> Effect {
		self.effect
	}

	#[must_use]
	pub fn host_node(&self) -> Option<&N> {
		self.host_node.as_ref()
	}

	#[must_use]
	pub fn state_cell_count(&self) -> usize {
		self.cells.len()
	}
}

#[derive(Debug)]
pub(crate) struct FiberTree<N> {
	fibers: SlotMap<FiberId, Fiber<N>>,
}

impl<N> Default for FiberTree<N> {
	fn default() -> Self {
		Self { fibers: SlotMap::with_key() }
	}
}

impl<N> FiberTree<N> {
	pub(crate) fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
		self.fibers.insert(fiber)
	}

	pub(crate) fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
		self.fibers.get(id)
	}

	pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<N>> {
		self.fibers.get_mut(id)
	}

	pub(crate) fn len(&self) -> usize {
		self.fibers.len()
	}

	pub(crate) fn children(&self, id: FiberId) -> Children<'_, N> {
		Children {
			tree: self,
			next: self.get(id).and_then(|fiber| fiber.first_child),
		}
	}

	/// The fiber whose host node children of `id` attach to.
	pub(crate) fn host_owner(&self, id: FiberId) -> Option<FiberId> {
		let fiber = self.get(id)?;
		if fiber.kind.is_host() {
			Some(id)
		} else {
			fiber.host_parent
		}
	}

	/// The pre-order successor of `id`: its first child, else the next sibling of it or of its closest ancestor that has one.
	///
	/// [`None`] once the walk is back at the root.
	pub(crate) fn next_unit(&self, id: FiberId) -> Option<FiberId> {
		let fiber = self.get(id)?;
		if fiber.first_child.is_some() {
			return fiber.first_child;
		}
		let mut current = Some(fiber);
		while let Some(fiber) = current {
			if fiber.next_sibling.is_some() {
				return fiber.next_sibling;
			}
			current = fiber.parent.and_then(|parent| self.get(parent));
		}
		None
	}

	/// Removes every fiber that isn't part of the tree at `root` and clears the alternates of those that are.
	///
	/// Returns the number of removed fibers.
	pub(crate) fn retain_tree(&mut self, root: Option<FiberId>) -> usize {
		let mut live = HashSet::with_capacity(self.fibers.len());
		let mut next = root;
		while let Some(id) = next {
			live.insert(id);
			next = self.next_unit(id);
		}

		let before = self.fibers.len();
		self.fibers.retain(|id, fiber| {
			fiber.alternate = None;
			live.contains(&id)
		});
		before - self.fibers.len()
	}
}

impl<N> Index<FiberId> for FiberTree<N> {
	type Output = Fiber<N>;

	fn index(&self, id: FiberId) -> &Self::Output {
		&self.fibers[id]
	}
}

impl<N> IndexMut<FiberId> for FiberTree<N> {
	fn index_mut(&mut self, id: FiberId) -> &mut Self::Output {
		&mut self.fibers[id]
	}
}

/// Iterates over a fiber's children in sibling order.
#[derive(Debug)]
pub struct Children<'a, N> {
	tree: &'a FiberTree<N>,
	next: Option<FiberId>,
}

impl<N> Iterator for Children<'_, N> {
	type Item = FiberId;

	fn next(&mut self) -> Option<Self::Item> {
		let id = self.next?;
		self.next = self.tree.get(id).and_then(|fiber| fiber.next_sibling);
		Some(id)
	}
}

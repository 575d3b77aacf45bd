use crate::{
	diff,
	error::{Error, Invariant},
	fiber::{Effect, FiberId, FiberKind, FiberTree},
	host::{HostError, HostRenderer},
};
use tracing::{instrument, trace, trace_span};

/// Applies a completed work-in-progress tree to the host in one uninterrupted pass.
///
/// Deletions go first, then the tree rooted at `root` is walked in pre-order and every placement and update is applied.
/// Effects are reset as they're consumed, and state updates that renders folded are drained from their queues.
///
/// Returns the number of host mutations.
/// On failure, the host tree may be partially mutated and the error says so.
#[instrument(skip(host, tree, deletions), fields(deletions = deletions.len()))]
pub(crate) fn commit_root<H: HostRenderer>(host: &mut H, tree: &mut FiberTree<H::Node>, deletions: &[FiberId], root: FiberId) -> Result<usize, Error> {
	let mut committer = Committer { host, tree, applied: 0 };

	for &deleted in deletions {
		let span = trace_span!("Deleting", fiber = ?deleted);
		let _enter = span.enter();
		committer.commit_deletion(deleted)?;
		committer.tree[deleted].effect = Effect::None;
	}

	let mut next = committer.tree[root].first_child;
	while let Some(id) = next {
		committer.commit_work(id)?;
		next = committer.tree.next_unit(id);
	}

	Ok(committer.applied)
}

struct Committer<'a, H: HostRenderer> {
	host: &'a mut H,
	tree: &'a mut FiberTree<H::Node>,
	applied: usize,
}

impl<H: HostRenderer> Committer<'_, H> {
	fn failed(&self, source: HostError) -> Error {
		Error::Commit { applied: self.applied, source }
	}

	fn host_parent_node(&self, id: FiberId) -> Result<H::Node, Error> {
		self.tree[id]
			.host_parent
			.and_then(|parent| self.tree.get(parent))
			.and_then(|parent| parent.host_node.clone())
			.ok_or(Error::Invariant(Invariant::MissingHostParent(id)))
	}

	fn commit_work(&mut self, id: FiberId) -> Result<(), Error> {
		let fiber = &self.tree[id];
		let span = trace_span!("Committing", fiber = ?id, effect = ?fiber.effect, tag = ?fiber.node.tag());
		let _enter = span.enter();

		match (fiber.effect, fiber.host_node.clone()) {
			(Effect::Deletion, _) => return Err(Invariant::DeletionInCommitWalk(id).into()),
			(Effect::Placement, Some(node)) => {
				let parent = self.host_parent_node(id)?;
				self.host.append_child(&parent, &node).map_err(|error| self.failed(error))?;
				self.applied += 1;
			}
			(Effect::Update, Some(node)) => {
				let previous = fiber
					.alternate
					.and_then(|alternate| self.tree.get(alternate))
					.map(|alternate| alternate.node.clone())
					.ok_or(Error::Invariant(Invariant::UpdateWithoutAlternate(id)))?;
				let next = fiber.node.clone();
				let mut applied = 0;
				let result = diff::update_node(self.host, &node, previous.props(), next.props(), &mut applied);
				self.applied += applied;
				result.map_err(|error| self.failed(error))?;
			}
			(Effect::None | Effect::Placement | Effect::Update, _) => (),
		}

		let fiber = &mut self.tree[id];
		if fiber.kind == FiberKind::Component {
			for cell in &fiber.cells {
				cell.drain_consumed();
			}
		}
		fiber.effect = Effect::None;
		Ok(())
	}

	/// Removes the host nodes of a deleted fiber.
	///
	/// A fiber that owns a host node is removed with everything below it.
	/// A component owns none, so its children are deleted instead.
	fn commit_deletion(&mut self, id: FiberId) -> Result<(), Error> {
		match self.tree[id].host_node.clone() {
			Some(node) => {
				let parent = self.host_parent_node(id)?;
				trace!(fiber = ?id, "Removing host node.");
				self.host.remove_child(&parent, &node).map_err(|error| self.failed(error))?;
				self.applied += 1;
			}
			None => {
				let children: Vec<_> = self.tree.children(id).collect();
				for child in children {
					self.commit_deletion(child)?;
				}
			}
		}
		Ok(())
	}
}

use crate::{
	fiber::{Effect, Fiber, FiberId, FiberTree},
	node::VirtualNode,
};
use tracing::{trace, trace_span};

/// Pairs `elements` with the previous children of `wip` by position and links the resulting fibers as its children.
///
/// Matching positions with equal tags become updates that keep the previous host node and point to the previous fiber.
/// Any other new element becomes a placement. Previous fibers without a same-typed counterpart are tagged for deletion
/// and pushed onto `deletions` instead of being linked into the new tree.
///
/// There are no keys: reordering same-typed children updates them in place,
/// which moves their state along with the position.
pub(crate) fn reconcile_children<N: Clone>(tree: &mut FiberTree<N>, deletions: &mut Vec<FiberId>, wip: FiberId, elements: &[VirtualNode]) {
	let span = trace_span!("reconcile_children", ?wip, elements = elements.len());
	let _enter = span.enter();

	let host_parent = tree.host_owner(wip);
	let mut old = tree.get(wip).and_then(|fiber| fiber.alternate).and_then(|alternate| tree.get(alternate)).and_then(|alternate| alternate.first_child);
	let mut elements = elements.iter();
	let mut previous_sibling: Option<FiberId> = None;

	loop {
		let new_fiber = match (old, elements.next()) {
			(None, None) => break,
			(Some(old_id), Some(element)) if tree[old_id].node.same_type(element) => {
				let host_node = tree[old_id].host_node.clone();
				Some(Fiber::update(element.clone(), wip, host_parent, old_id, host_node))
			}
			(old_id, Some(element)) => {
				if let Some(old_id) = old_id {
					delete(tree, deletions, old_id);
				}
				Some(Fiber::placement(element.clone(), wip, host_parent))
			}
			(Some(old_id), None) => {
				delete(tree, deletions, old_id);
				None
			}
		};

		if let Some(old_id) = old {
			old = tree[old_id].next_sibling;
		}

		if let Some(fiber) = new_fiber {
			trace!(effect = ?fiber.effect, tag = ?fiber.node.tag(), "Reconciled child.");
			let id = tree.insert(fiber);
			match previous_sibling {
				Some(previous) => tree[previous].next_sibling = Some(id),
				None => tree[wip].first_child = Some(id),
			}
			previous_sibling = Some(id);
		}
	}
}

fn delete<N>(tree: &mut FiberTree<N>, deletions: &mut Vec<FiberId>, id: FiberId) {
	trace!(?id, tag = ?tree[id].node.tag(), "Tagging for deletion.");
	tree[id].effect = Effect::Deletion;
	deletions.push(id);
}

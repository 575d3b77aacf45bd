//! Per-fiber local state.
//!
//! State cells are matched to the previous render of the same fiber by the order in which a render
//! function requests them. Nothing stops a render function from requesting a different number or order
//! of cells between renders; a type mismatch at a position is detected and aborts the pass,
//! a changed count is only logged.

use crate::error::Invariant;
use core::{
	any::{type_name, Any},
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	marker::PhantomData,
};
use std::rc::Rc;
use tracing::{trace, warn};

type Update = Rc<dyn Fn(&dyn Any) -> Option<Rc<dyn Any>>>;
type UpdateQueue = Rc<RefCell<Vec<Update>>>;

/// One persisted state slot.
///
/// The queue is shared between all generations of the same cell.
/// Renders fold it without draining it, and the commit drains exactly the `consumed` entries the render saw.
#[derive(Clone)]
pub(crate) struct StateCell {
	state: Rc<dyn Any>,
	queue: UpdateQueue,
	consumed: usize,
}

impl StateCell {
	/// Removes the updates that have been folded into this cell's state.
	pub(crate) fn drain_consumed(&self) {
		let mut queue = self.queue.borrow_mut();
		let consumed = self.consumed.min(queue.len());
		queue.drain(..consumed);
	}
}

impl Debug for StateCell {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateCell")
			.field("queued", &self.queue.borrow().len())
			.field("consumed", &self.consumed)
			.finish_non_exhaustive()
	}
}

/// The render context handed to a component's render function.
///
/// Only reachable during a render, which is what makes state requests outside of one impossible.
pub struct Hooks<'a> {
	component: &'static str,
	previous: &'a [StateCell],
	cells: Vec<StateCell>,
	rerender: Rc<Cell<bool>>,
	violation: Option<Invariant>,
}

impl<'a> Hooks<'a> {
	pub(crate) fn new(component: &'static str, previous: &'a [StateCell], rerender: Rc<Cell<bool>>) -> Self {
		Self {
			component,
			previous,
			cells: Vec::with_capacity(previous.len()),
			rerender,
			violation: None,
		}
	}

	/// Requests the next state cell.
	///
	/// The first render of a fiber starts from `initial`. Later renders start from the previous state
	/// and apply queued updates in the order they were requested.
	///
	/// Cells are matched by call order: the `n`th call corresponds to the `n`th call of the previous render.
	/// Don't request state conditionally.
	pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, Setter<T>) {
		let index = self.cells.len();
		let (mut state, queue) = match self.previous.get(index) {
			Some(cell) => (Rc::clone(&cell.state), Rc::clone(&cell.queue)),
			None => (Rc::new(initial.clone()) as Rc<dyn Any>, UpdateQueue::default()),
		};

		// Updates may queue more updates on this cell while they run.
		let updates: Vec<Update> = queue.borrow().clone();
		let consumed = updates.len();
		for update in &updates {
			match update(&*state) {
				Some(next) => state = next,
				None => {
					self.violate::<T>(index);
					break;
				}
			}
		}

		let value = match (*state).downcast_ref::<T>() {
			Some(value) if self.violation.is_none() => value.clone(),
			Some(_) => initial,
			None => {
				self.violate::<T>(index);
				initial
			}
		};
		if consumed != 0 {
			trace!(component = self.component, index, consumed, "Folded queued state updates.");
		}

		self.cells.push(StateCell {
			state: Rc::new(value.clone()),
			queue: Rc::clone(&queue),
			consumed,
		});
		(
			value,
			Setter {
				queue,
				rerender: Rc::clone(&self.rerender),
				_state: PhantomData,
			},
		)
	}

	/// The name of the component that's rendering.
	#[must_use]
	pub fn component(&self) -> &'static str {
		self.component
	}

	fn violate<T>(&mut self, index: usize) {
		if self.violation.is_none() {
			self.violation = Some(Invariant::StateCellType {
				component: self.component,
				index,
				expected: type_name::<T>(),
			});
		}
	}

	pub(crate) fn finish(self) -> Result<Vec<StateCell>, Invariant> {
		if let Some(violation) = self.violation {
			return Err(violation);
		}
		if !self.previous.is_empty() && self.previous.len() != self.cells.len() {
			warn!(
				component = self.component,
				previous = self.previous.len(),
				current = self.cells.len(),
				"State cell count changed between renders. Cells are matched by call order, so state may have moved between requests."
			);
		}
		Ok(self.cells)
	}
}

impl Debug for Hooks<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks")
			.field("component", &self.component)
			.field("previous", &self.previous.len())
			.field("cursor", &self.cells.len())
			.finish_non_exhaustive()
	}
}

/// Queues updates for one state cell and schedules a re-render from the root.
///
/// Setters stay valid across renders, since every generation of a cell shares its update queue.
pub struct Setter<T> {
	queue: UpdateQueue,
	rerender: Rc<Cell<bool>>,
	_state: PhantomData<fn(T) -> T>,
}

impl<T: 'static> Setter<T> {
	/// Queues `update`. It runs during the next render of the owning fiber.
	pub fn update(&self, update: impl Fn(&T) -> T + 'static) {
		let update: Update = Rc::new(move |state: &dyn Any| state.downcast_ref::<T>().map(|state| Rc::new(update(state)) as Rc<dyn Any>));
		let queued = {
			let mut queue = self.queue.borrow_mut();
			queue.push(update);
			queue.len()
		};
		trace!(queued, "Queued state update.");
		self.rerender.set(true);
	}

	/// Queues replacing the state with `value`.
	pub fn set(&self, value: T)
	where
		T: Clone,
	{
		self.update(move |_| value.clone());
	}
}

impl<T> Clone for Setter<T> {
	fn clone(&self) -> Self {
		Self {
			queue: Rc::clone(&self.queue),
			rerender: Rc::clone(&self.rerender),
			_state: PhantomData,
		}
	}
}

impl<T> Debug for Setter<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Setter")
			.field("state", &type_name::<T>())
			.field("queued", &self.queue.borrow().len())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn render<T: Clone + 'static>(previous: &[StateCell], rerender: &Rc<Cell<bool>>, initial: T) -> Result<(T, Setter<T>, Vec<StateCell>), Invariant> {
		let mut hooks = Hooks::new("test", previous, Rc::clone(rerender));
		let (value, setter) = hooks.use_state(initial);
		Ok((value, setter, hooks.finish()?))
	}

	#[test]
	fn updates_fold_in_order_and_drain_on_commit() {
		let rerender = Rc::new(Cell::new(false));
		let (value, setter, cells) = render(&[], &rerender, 1).unwrap();
		assert_eq!(value, 1);
		assert!(!rerender.get());

		setter.update(|c| c + 1);
		setter.update(|c| c * 10);
		assert!(rerender.get());

		let (value, _, next) = render(&cells, &rerender, 1).unwrap();
		assert_eq!(value, 20);

		// Not committed yet, so rendering again from the same cells sees the same updates.
		let (value, _, next_again) = render(&cells, &rerender, 1).unwrap();
		assert_eq!(value, 20);
		drop(next_again);

		next[0].drain_consumed();
		let (value, _, _) = render(&next, &rerender, 1).unwrap();
		assert_eq!(value, 20);
	}

	#[test]
	fn updates_after_the_render_survive_the_commit() {
		let rerender = Rc::new(Cell::new(false));
		let (_, setter, cells) = render(&[], &rerender, 0).unwrap();
		setter.set(5);
		let (value, _, next) = render(&cells, &rerender, 0).unwrap();
		assert_eq!(value, 5);

		setter.update(|c| c + 1);
		next[0].drain_consumed();
		let (value, _, _) = render(&next, &rerender, 0).unwrap();
		assert_eq!(value, 6);
	}

	#[test]
	fn update_may_queue_another_update() {
		let rerender = Rc::new(Cell::new(false));
		let (_, setter, cells) = render(&[], &rerender, 0).unwrap();
		let inner = setter.clone();
		setter.update(move |value| {
			inner.set(5);
			value + 1
		});

		let (value, _, next) = render(&cells, &rerender, 0).unwrap();
		assert_eq!(value, 1);
		next[0].drain_consumed();
		let (value, _, _) = render(&next, &rerender, 0).unwrap();
		assert_eq!(value, 5);
	}

	#[test]
	fn type_mismatch_is_reported() {
		let rerender = Rc::new(Cell::new(false));
		let (_, _, cells) = render(&[], &rerender, 1_i32).unwrap();
		let error = render(&cells, &rerender, String::new()).err().unwrap();
		assert!(matches!(error, Invariant::StateCellType { index: 0, .. }));
	}
}

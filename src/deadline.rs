//! Time budgets for a single slice of work.
//!
//! The embedding environment decides when a slice happens and hands the engine one of these for its duration.

use core::{cell::Cell, time::Duration};
use std::time::Instant;

pub trait Deadline {
	/// Queried once after every unit of work.
	fn time_remaining(&self) -> Duration;
}

/// Never runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
	fn time_remaining(&self) -> Duration {
		Duration::MAX
	}
}

/// Runs out at a fixed point in wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
	end: Instant,
}

impl Timeout {
	#[must_use]
	pub fn at(end: Instant) -> Self {
		Self { end }
	}

	#[must_use]
	pub fn after(budget: Duration) -> Self {
		Self::at(Instant::now() + budget)
	}
}

impl Deadline for Timeout {
	fn time_remaining(&self) -> Duration {
		self.end.saturating_duration_since(Instant::now())
	}
}

/// Runs out after a fixed number of units of work, regardless of time.
///
/// Since the engine always performs at least one unit per slice, budgets of `0` and `1` behave the same.
#[derive(Debug)]
pub struct UnitBudget {
	remaining: Cell<usize>,
}

impl UnitBudget {
	#[must_use]
	pub fn new(units: usize) -> Self {
		Self { remaining: Cell::new(units) }
	}
}

impl Deadline for UnitBudget {
	fn time_remaining(&self) -> Duration {
		let remaining = self.remaining.get().saturating_sub(1);
		self.remaining.set(remaining);
		if remaining == 0 {
			Duration::ZERO
		} else {
			Duration::MAX
		}
	}
}

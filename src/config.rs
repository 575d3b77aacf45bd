use core::time::Duration;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// The driver yields once the deadline has less time remaining than this.
	pub yield_threshold: Duration,
}

impl Config {
	/// The threshold browsers' idle callbacks are usually checked against.
	pub const DEFAULT_YIELD_THRESHOLD: Duration = Duration::from_millis(1);

	#[must_use]
	pub fn with_yield_threshold(mut self, yield_threshold: Duration) -> Self {
		self.yield_threshold = yield_threshold;
		self
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			yield_threshold: Self::DEFAULT_YIELD_THRESHOLD,
		}
	}
}

use crate::{fiber::FiberId, host::HostError};
use thiserror::Error;

/// What a render function may fail with.
pub type RenderError = Box<dyn std::error::Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// A host operation failed while the work-in-progress tree was being built.
	///
	/// The pass was discarded. The host tree still shows the previous commit.
	#[error("host operation failed during render: {0}")]
	Host(#[from] HostError),

	/// A host operation failed part-way through a commit.
	///
	/// The host tree is left inconsistent with every fiber tree and the engine is poisoned.
	#[error("commit failed after {applied} host mutation(s), the host tree is inconsistent: {source}")]
	Commit {
		applied: usize,
		#[source]
		source: HostError,
	},

	#[error("render function `{component}` failed: {source}")]
	Render {
		component: &'static str,
		#[source]
		source: RenderError,
	},

	#[error(transparent)]
	Invariant(#[from] Invariant),

	/// A previous commit failed. Recover the host with [`Engine::into_host`](crate::Engine::into_host).
	#[error("engine is poisoned by an earlier failed commit")]
	Poisoned,
}

/// Broken reconciliation contracts. These are bugs in the engine or in a render function.
#[derive(Debug, Error)]
pub enum Invariant {
	#[error("fiber {0:?} is tagged for deletion but was reached by the commit walk")]
	DeletionInCommitWalk(FiberId),

	#[error("fiber {0:?} has no host-owning ancestor")]
	MissingHostParent(FiberId),

	#[error("fiber {0:?} is tagged for update but has no alternate")]
	UpdateWithoutAlternate(FiberId),

	/// State was requested with a different type than the cell at that position holds,
	/// usually because state is requested conditionally.
	#[error("state cell {index} of `{component}` doesn't hold a `{expected}`")]
	StateCellType {
		component: &'static str,
		index: usize,
		expected: &'static str,
	},
}

use crate::{
	commit,
	config::Config,
	deadline::{Deadline, Unbounded},
	diff,
	error::Error,
	fiber::{Children, Effect, Fiber, FiberId, FiberKind, FiberTree},
	hooks::Hooks,
	host::HostRenderer,
	node::{Tag, VirtualNode},
	reconcile::reconcile_children,
};
use core::{cell::Cell, mem};
use std::rc::Rc;
use tracing::{debug, error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, warn, Level};

/// Tag of the virtual node that holds the rendered node as the root fiber's only child.
pub const ROOT_TAG: &str = "#root";

/// What a call to [`Engine::work_loop`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Slice {
	/// There was nothing to do.
	Idle,
	/// The deadline ran out before the pass completed. Call again to resume.
	Yielded { performed: usize },
	/// The pass completed and was applied to the host.
	Committed { performed: usize, mutations: usize },
}

/// Drives render passes against a [`HostRenderer`].
///
/// # Correct Use
///
/// The engine never schedules itself. Call [`Engine::work_loop`] whenever the environment grants time
/// and [`Engine::has_pending_work`] is `true`, for example from an idle callback or the event loop.
/// [`Engine::run_until_idle`] does that synchronously.
///
/// Only one pass is in flight at a time. [`Engine::render`] calls and state updates that arrive while one is
/// in flight are picked up by the next pass, which starts after the current one committed.
pub struct Engine<H: HostRenderer> {
	host: H,
	config: Config,
	fibers: FiberTree<H::Node>,
	current_root: Option<FiberId>,
	wip_root: Option<FiberId>,
	next_unit: Option<FiberId>,
	deletions: Vec<FiberId>,
	pending_render: Option<(VirtualNode, H::Node)>,
	rerender: Rc<Cell<bool>>,
	poisoned: bool,
}

impl<H: HostRenderer> Engine<H> {
	#[must_use]
	pub fn new(host: H) -> Self {
		Self::with_config(host, Config::default())
	}

	#[must_use]
	pub fn with_config(host: H, config: Config) -> Self {
		Self {
			host,
			config,
			fibers: FiberTree::default(),
			current_root: None,
			wip_root: None,
			next_unit: None,
			deletions: Vec::new(),
			pending_render: None,
			rerender: Rc::new(Cell::new(false)),
			poisoned: false,
		}
	}

	/// Schedules a pass that renders `node` as the only child of `container`.
	///
	/// The pass diffs against whatever was committed last, so this also forces a full re-render.
	#[instrument(skip(self, node))]
	pub fn render(&mut self, node: VirtualNode, container: H::Node) {
		let root = VirtualNode::from(crate::node::element(ROOT_TAG).child(node));
		if self.wip_root.is_some() {
			debug!("A pass is in flight. Queuing the render.");
			self.pending_render = Some((root, container));
		} else {
			self.begin_pass(root, container);
		}
	}

	/// Whether [`Engine::work_loop`] would do anything.
	#[must_use]
	pub fn has_pending_work(&self) -> bool {
		!self.poisoned && (self.wip_root.is_some() || self.pending_render.is_some() || (self.rerender.get() && self.current_root.is_some()))
	}

	/// Performs units of work until the pass completes or `deadline` runs out, then commits a completed pass.
	///
	/// At least one unit is performed if there is work, so each slice makes progress.
	///
	/// # Errors
	///
	/// A failed render or a host failure during render discards the pass and leaves the host as it was.
	/// Nothing is retried. State updates the pass folded stay queued for whichever pass renders their component next.
	/// A failure during commit poisons the engine, see [`Error::Commit`].
	#[instrument(skip(self, deadline))]
	pub fn work_loop(&mut self, deadline: &impl Deadline) -> Result<Slice, Error> {
		if self.poisoned {
			return Err(Error::Poisoned);
		}
		if self.wip_root.is_none() && !self.start_next_pass() {
			return Ok(Slice::Idle);
		}

		let mut performed = 0;
		while let Some(unit) = self.next_unit {
			match self.perform_unit_of_work(unit) {
				Ok(next) => self.next_unit = next,
				Err(error) => {
					error!("Render pass failed: {}", error);
					self.abort_pass();
					return Err(error);
				}
			}
			performed += 1;
			if deadline.time_remaining() < self.config.yield_threshold {
				break;
			}
		}

		if self.next_unit.is_some() {
			trace!(performed, "Yielding.");
			return Ok(Slice::Yielded { performed });
		}
		let mutations = self.commit_root()?;
		Ok(Slice::Committed { performed, mutations })
	}

	/// Drives [`Engine::work_loop`] without a deadline until there's nothing left to do.
	///
	/// Returns the number of commits. Doesn't return if a render function unconditionally updates state.
	///
	/// # Errors
	///
	/// See [`Engine::work_loop`].
	pub fn run_until_idle(&mut self) -> Result<usize, Error> {
		let mut commits = 0;
		loop {
			match self.work_loop(&Unbounded)? {
				Slice::Idle => return Ok(commits),
				Slice::Committed { .. } => commits += 1,
				Slice::Yielded { .. } => (),
			}
		}
	}

	fn start_next_pass(&mut self) -> bool {
		if let Some((root, container)) = self.pending_render.take() {
			self.begin_pass(root, container);
			return true;
		}
		if !self.rerender.get() {
			return false;
		}
		let Some(current) = self.current_root.and_then(|id| self.fibers.get(id)) else {
			return false;
		};
		let Some(container) = current.host_node.clone() else {
			return false;
		};
		debug!("State changed. Re-rendering from the root.");
		let root = current.node.clone();
		self.begin_pass(root, container);
		true
	}

	fn begin_pass(&mut self, root: VirtualNode, container: H::Node) {
		debug!(?container, "Starting render pass.");
		self.rerender.set(false);
		let root = self.fibers.insert(Fiber::root(root, container, self.current_root));
		self.wip_root = Some(root);
		self.next_unit = Some(root);
		self.deletions.clear();
	}

	/// Renders one fiber and reconciles its children. Returns the next fiber to work on.
	#[instrument(level = "trace", skip(self))]
	fn perform_unit_of_work(&mut self, id: FiberId) -> Result<Option<FiberId>, Error> {
		let fiber = &self.fibers[id];
		let node = fiber.node.clone();
		match (fiber.kind, node.tag()) {
			(FiberKind::Root, _) => reconcile_children(&mut self.fibers, &mut self.deletions, id, node.children()),
			(_, Tag::Component(component)) => {
				let previous = fiber.alternate.and_then(|alternate| self.fibers.get(alternate)).map(|alternate| alternate.cells.clone()).unwrap_or_default();
				let mut hooks = Hooks::new(component.name(), &previous, Rc::clone(&self.rerender));
				let children = component.render(&mut hooks, node.props()).map_err(|source| Error::Render {
					component: component.name(),
					source,
				})?;
				self.fibers[id].cells = hooks.finish()?;
				reconcile_children(&mut self.fibers, &mut self.deletions, id, &children);
			}
			(_, Tag::Element(_) | Tag::Text) => {
				if fiber.host_node.is_none() {
					let host_node = diff::create_node(&mut self.host, &node)?;
					self.fibers[id].host_node = host_node;
				}
				reconcile_children(&mut self.fibers, &mut self.deletions, id, node.children());
			}
		}
		Ok(self.fibers.next_unit(id))
	}

	fn commit_root(&mut self) -> Result<usize, Error> {
		let Some(root) = self.wip_root else { return Ok(0) };
		let deletions = mem::take(&mut self.deletions);
		match commit::commit_root(&mut self.host, &mut self.fibers, &deletions, root) {
			Ok(mutations) => {
				self.current_root = Some(root);
				self.wip_root = None;
				let released = self.fibers.retain_tree(Some(root));
				info!("Committed {} host mutation(s). Released {} fiber(s), {} live.", mutations, released, self.fibers.len());
				if STATIC_MAX_LEVEL >= Level::WARN && deletions.len() >= 100 {
					warn!(
						"A single pass deleted {} subtrees.\n\
						Children are matched by position, so inserting near the front of a long list replaces everything after it.",
						deletions.len()
					);
				}
				Ok(mutations)
			}
			Err(error) => {
				error!("Commit failed. The host tree no longer matches any fiber tree: {}", error);
				self.poisoned = true;
				self.wip_root = None;
				self.next_unit = None;
				Err(error)
			}
		}
	}

	/// Discards the work-in-progress tree. The current tree and pending state updates are kept.
	fn abort_pass(&mut self) {
		for id in self.deletions.drain(..) {
			if let Some(fiber) = self.fibers.get_mut(id) {
				fiber.effect = Effect::None;
			}
		}
		self.wip_root = None;
		self.next_unit = None;
		let released = self.fibers.retain_tree(self.current_root);
		debug!(released, "Discarded work-in-progress tree.");
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	/// Mutating the host tree behind the engine's back makes later commits fail or misplace nodes.
	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	/// Gives up the engine and returns the host, for example to recover from a poisoned engine.
	pub fn into_host(self) -> H {
		self.host
	}

	#[must_use]
	pub fn is_poisoned(&self) -> bool {
		self.poisoned
	}

	/// The root of the last committed tree.
	#[must_use]
	pub fn current_root(&self) -> Option<FiberId> {
		self.current_root
	}

	/// The root of the tree under construction.
	#[must_use]
	pub fn wip_root(&self) -> Option<FiberId> {
		self.wip_root
	}

	/// Where the in-flight pass resumes.
	#[must_use]
	pub fn next_unit(&self) -> Option<FiberId> {
		self.next_unit
	}

	/// Previous fibers tagged for deletion by the in-flight pass.
	#[must_use]
	pub fn pending_deletions(&self) -> &[FiberId] {
		&self.deletions
	}

	#[must_use]
	pub fn fiber(&self, id: FiberId) -> Option<&Fiber<H::Node>> {
		self.fibers.get(id)
	}

	pub fn children(&self, id: FiberId) -> Children<'_, H::Node> {
		self.fibers.children(id)
	}
}

impl<H: HostRenderer + core::fmt::Debug> core::fmt::Debug for Engine<H> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Engine")
			.field("host", &self.host)
			.field("config", &self.config)
			.field("fibers", &self.fibers.len())
			.field("current_root", &self.current_root)
			.field("wip_root", &self.wip_root)
			.field("next_unit", &self.next_unit)
			.field("poisoned", &self.poisoned)
			.finish_non_exhaustive()
	}
}

#![doc(html_root_url = "https://docs.rs/xylem/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! An interruptible fiber reconciler.
//!
//! Render functions return [`VirtualNode`] trees. The [`Engine`] diffs each render against the last committed
//! one in small units of work that can be spread over several time slices, then applies the resulting
//! mutations to a [`HostRenderer`] in one uninterrupted commit.
//!
//! [`memory::MemoryHost`] is a complete headless host.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod commit;
mod config;
mod deadline;
pub mod diff;
mod engine;
mod error;
mod fiber;
mod hooks;
mod host;
pub mod memory;
pub mod node;
mod reconcile;

pub use config::Config;
pub use deadline::{Deadline, Timeout, Unbounded, UnitBudget};
pub use engine::{Engine, Slice, ROOT_TAG};
pub use error::{Error, Invariant, RenderError};
pub use fiber::{Children, Effect, Fiber, FiberId, FiberKind};
pub use hooks::{Hooks, Setter};
pub use host::{HostError, HostKind, HostRenderer};
pub use node::{component, element, make_node, text, AttrValue, Component, Event, Handler, Props, Tag, VirtualNode};

//! Immutable descriptions of the desired output tree.
//!
//! A [`VirtualNode`] is cheap to clone (it's reference-counted) and never changes after construction.
//! Properties are sorted into attributes, event handlers and children once, when the node is built,
//! so that diffing never has to look at key prefixes again.

use crate::{error::RenderError, hooks::Hooks};
use core::{
	any::{type_name, TypeId},
	fmt::{self, Debug, Display, Formatter},
	mem::size_of,
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::warn;

/// The reserved property key for the child list. It's never stored as an attribute.
pub const CHILDREN_KEY: &str = "children";

/// The attribute under which text nodes carry their content.
pub const TEXT_VALUE_KEY: &str = "nodeValue";

/// Prefix that marks a property key as an event handler, as in `onClick`.
pub const HANDLER_PREFIX: &str = "on";

/// A plain attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
	Str(Rc<str>),
	Int(i64),
	Float(f64),
	Bool(bool),
}

impl Display for AttrValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Str(s) => f.write_str(s),
			AttrValue::Int(i) => Display::fmt(i, f),
			AttrValue::Float(x) => Display::fmt(x, f),
			AttrValue::Bool(b) => Display::fmt(b, f),
		}
	}
}

impl From<&str> for AttrValue {
	fn from(value: &str) -> Self {
		AttrValue::Str(value.into())
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		AttrValue::Str(value.into())
	}
}

impl From<Rc<str>> for AttrValue {
	fn from(value: Rc<str>) -> Self {
		AttrValue::Str(value)
	}
}

impl From<i32> for AttrValue {
	fn from(value: i32) -> Self {
		AttrValue::Int(value.into())
	}
}

impl From<u32> for AttrValue {
	fn from(value: u32) -> Self {
		AttrValue::Int(value.into())
	}
}

impl From<i64> for AttrValue {
	fn from(value: i64) -> Self {
		AttrValue::Int(value)
	}
}

impl From<f64> for AttrValue {
	fn from(value: f64) -> Self {
		AttrValue::Float(value)
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		AttrValue::Bool(value)
	}
}

/// What a host hands to an event handler when the event fires.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	name: String,
	value: Option<AttrValue>,
}

impl Event {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), value: None }
	}

	/// Attaches a payload, for example the current value of an input.
	#[must_use]
	pub fn with_value(mut self, value: impl Into<AttrValue>) -> Self {
		self.value = Some(value.into());
		self
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	#[must_use]
	pub fn value(&self) -> Option<&AttrValue> {
		self.value.as_ref()
	}
}

/// A shared event handler.
///
/// Two handlers are the same handler only if they share their allocation.
/// Re-creating a closure during a render therefore always counts as a change.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
	pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Handler").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

type RenderFn = dyn Fn(&mut Hooks<'_>, &Props) -> Result<Vec<VirtualNode>, RenderError>;

/// A render function.
///
/// Function items and closures without captures are identified by their type alone,
/// so creating them anew for each render doesn't make the reconciler treat them as a different component.
/// Anything else (function pointers, capturing closures) is only equal to clones of the same [`Component`],
/// since values of one such type can be different functions. Create those once and clone them.
#[derive(Clone)]
pub struct Component {
	id: TypeId,
	zero_sized: bool,
	name: &'static str,
	render: Rc<RenderFn>,
}

impl Component {
	pub fn new<F>(render: F) -> Self
	where
		F: Fn(&mut Hooks<'_>, &Props) -> Result<Vec<VirtualNode>, RenderError> + 'static,
	{
		Self {
			id: TypeId::of::<F>(),
			zero_sized: size_of::<F>() == 0,
			name: type_name::<F>(),
			render: Rc::new(render),
		}
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Runs the render function.
	///
	/// # Errors
	///
	/// Whatever the render function returns.
	pub fn render(&self, hooks: &mut Hooks<'_>, props: &Props) -> Result<Vec<VirtualNode>, RenderError> {
		(self.render)(hooks, props)
	}
}

impl PartialEq for Component {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id && (self.zero_sized || Rc::as_ptr(&self.render).cast::<()>() == Rc::as_ptr(&other.render).cast::<()>())
	}
}

impl Debug for Component {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Component").field(&self.name).finish()
	}
}

/// The type of a virtual node. The reconciler reuses a previous fiber only if its tag is equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
	Element(Rc<str>),
	Text,
	Component(Component),
}

impl From<&str> for Tag {
	fn from(name: &str) -> Self {
		Tag::Element(name.into())
	}
}

impl From<String> for Tag {
	fn from(name: String) -> Self {
		Tag::Element(name.into())
	}
}

impl From<Component> for Tag {
	fn from(component: Component) -> Self {
		Tag::Component(component)
	}
}

/// A single property as passed to [`make_node`], before it's sorted into [`Props`].
#[derive(Debug, Clone)]
pub enum PropValue {
	Attr(AttrValue),
	Handler(Handler),
}

/// Conversions from everything that converts into [`AttrValue`].
///
/// Spelled out per type since a blanket `impl<T: Into<AttrValue>>` would overlap with the reflexive [`From`].
macro_rules! from_attr_values {
	($target:ty, $convert:expr) => {
		from_attr_values!(@each $target, $convert, AttrValue, &str, String, Rc<str>, i32, u32, i64, f64, bool);
	};
	(@each $target:ty, $convert:expr, $($source:ty),+) => {
		$(
			impl From<$source> for $target {
				fn from(value: $source) -> Self {
					$convert(AttrValue::from(value))
				}
			}
		)+
	};
}

from_attr_values!(PropValue, PropValue::Attr);

impl From<Handler> for PropValue {
	fn from(handler: Handler) -> Self {
		PropValue::Handler(handler)
	}
}

#[derive(Debug, Clone, Default)]
pub struct Props {
	attributes: HashMap<String, AttrValue>,
	handlers: HashMap<String, Handler>,
	children: Vec<VirtualNode>,
}

impl Props {
	#[must_use]
	pub fn attributes(&self) -> &HashMap<String, AttrValue> {
		&self.attributes
	}

	#[must_use]
	pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
		self.attributes.get(key)
	}

	/// Handlers keyed by their property key (`onClick`, not `click`).
	#[must_use]
	pub fn handlers(&self) -> &HashMap<String, Handler> {
		&self.handlers
	}

	#[must_use]
	pub fn handler(&self, key: &str) -> Option<&Handler> {
		self.handlers.get(key)
	}

	#[must_use]
	pub fn children(&self) -> &[VirtualNode] {
		&self.children
	}

	fn insert(&mut self, key: String, value: PropValue) {
		match value {
			PropValue::Attr(_) if key == CHILDREN_KEY => {
				warn!("Ignoring attribute under the reserved key {:?}.", CHILDREN_KEY);
			}
			PropValue::Attr(value) => {
				self.attributes.insert(key, value);
			}
			PropValue::Handler(handler) => {
				if !key.starts_with(HANDLER_PREFIX) {
					warn!("Handler key {:?} lacks the {:?} prefix. The whole key will be used as event name.", key, HANDLER_PREFIX);
				}
				self.handlers.insert(key, handler);
			}
		}
	}
}

#[derive(Debug)]
struct NodeData {
	tag: Tag,
	props: Props,
}

#[derive(Debug, Clone)]
pub struct VirtualNode(Rc<NodeData>);

impl VirtualNode {
	#[must_use]
	pub fn new(tag: Tag, props: Props) -> Self {
		Self(Rc::new(NodeData { tag, props }))
	}

	#[must_use]
	pub fn tag(&self) -> &Tag {
		&self.0.tag
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.0.props
	}

	#[must_use]
	pub fn children(&self) -> &[VirtualNode] {
		&self.0.props.children
	}

	/// Shorthand for `self.tag() == other.tag()`.
	#[must_use]
	pub fn same_type(&self, other: &Self) -> bool {
		self.tag() == other.tag()
	}
}

/// Creates a text node.
pub fn text(value: impl Into<AttrValue>) -> VirtualNode {
	let mut props = Props::default();
	props.attributes.insert(TEXT_VALUE_KEY.to_owned(), value.into());
	VirtualNode::new(Tag::Text, props)
}

from_attr_values!(VirtualNode, text);

/// Creates a node from a tag, a flat property list and children.
///
/// Handler values become event handlers, everything else becomes an attribute.
/// Children that aren't nodes yet are wrapped as text nodes through their [`Into`] conversion.
/// Nothing is validated here. Bad tags or values surface as host failures later.
pub fn make_node<K, P, C>(tag: impl Into<Tag>, props: impl IntoIterator<Item = (K, P)>, children: impl IntoIterator<Item = C>) -> VirtualNode
where
	K: Into<String>,
	P: Into<PropValue>,
	C: Into<VirtualNode>,
{
	let mut builder = NodeBuilder::new(tag.into());
	for (key, value) in props {
		builder = builder.prop(key, value);
	}
	builder.children(children).build()
}

/// Starts building an element node.
pub fn element(name: &str) -> NodeBuilder {
	NodeBuilder::new(Tag::from(name))
}

/// Starts building a component node.
#[must_use]
pub fn component(component: &Component) -> NodeBuilder {
	NodeBuilder::new(Tag::Component(component.clone()))
}

#[derive(Debug)]
#[must_use]
pub struct NodeBuilder {
	tag: Tag,
	props: Props,
}

impl NodeBuilder {
	pub fn new(tag: Tag) -> Self {
		Self { tag, props: Props::default() }
	}

	pub fn prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
		self.props.insert(key.into(), value.into());
		self
	}

	pub fn attr(self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.prop(key, PropValue::Attr(value.into()))
	}

	/// Adds an event handler. `key` is the property key, like `onClick`.
	pub fn on(self, key: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
		self.prop(key, PropValue::Handler(Handler::new(handler)))
	}

	pub fn child(mut self, child: impl Into<VirtualNode>) -> Self {
		self.props.children.push(child.into());
		self
	}

	pub fn children<C: Into<VirtualNode>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
		self.props.children.extend(children.into_iter().map(Into::into));
		self
	}

	pub fn build(self) -> VirtualNode {
		VirtualNode::new(self.tag, self.props)
	}
}

impl From<NodeBuilder> for VirtualNode {
	fn from(builder: NodeBuilder) -> Self {
		builder.build()
	}
}

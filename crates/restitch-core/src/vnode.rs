use std::any::TypeId;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::component::{Component, ComponentId, ComponentInit, Props};
use crate::host::HostNodeId;
use crate::value::AttrMap;

/// Stable child identity used by keyed list reconciliation.
pub type Key = String;

/// Shared cell filled with the host node a description resolved to, and
/// cleared again when that node is recycled.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<Cell<Option<HostNodeId>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<HostNodeId> {
        self.0.get()
    }

    pub(crate) fn set(&self, id: HostNodeId) {
        self.0.set(Some(id));
    }

    pub(crate) fn clear(&self) {
        self.0.set(None);
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.0.get()).finish()
    }
}

/// Like [`NodeRef`], but resolved to the mounted component instance.
#[derive(Clone, Default)]
pub struct InstanceRef(Rc<Cell<Option<ComponentId>>>);

impl InstanceRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ComponentId> {
        self.0.get()
    }

    pub(crate) fn set(&self, id: ComponentId) {
        self.0.set(Some(id));
    }

    pub(crate) fn clear(&self) {
        self.0.set(None);
    }
}

impl PartialEq for InstanceRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstanceRef").field(&self.0.get()).finish()
    }
}

/// Constructor identity of a component type, resolved once at description
/// construction. Equality and hashing go through the implementing type's
/// `TypeId`, so two descriptions of the same Rust type always match.
#[derive(Clone, Copy)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
    create: fn(&Props, &AttrMap) -> Box<dyn Component>,
    initial_state: fn(&Props, &AttrMap) -> AttrMap,
}

impl ComponentKind {
    pub fn of<C: Component + ComponentInit + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            create: |props, context| Box::new(C::init(props, context)),
            initial_state: C::initial_state,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn instantiate(&self, props: &Props, context: &AttrMap) -> Box<dyn Component> {
        (self.create)(props, context)
    }

    pub(crate) fn initial_state(&self, props: &Props, context: &AttrMap) -> AttrMap {
        (self.initial_state)(props, context)
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKind {}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentKind").field(&self.name).finish()
    }
}

/// A primitive (host-tag) description node.
#[derive(Debug, Clone, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub attrs: AttrMap,
    pub children: Vec<VNode>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
}

/// A component-typed description node.
#[derive(Debug, Clone, PartialEq)]
pub struct VComponent {
    pub kind: ComponentKind,
    pub attrs: AttrMap,
    pub children: Vec<VNode>,
    pub key: Option<Key>,
    pub instance_ref: Option<InstanceRef>,
}

/// Immutable description of desired output for one render pass.
///
/// `Empty` stands in for `null`/boolean holes in a children list; the
/// reconciler normalizes it to an empty text node.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Empty,
    Text(String),
    Element(VElement),
    Component(VComponent),
}

impl VNode {
    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Element(e) => e.key.as_ref(),
            VNode::Component(c) => c.key.as_ref(),
            _ => None,
        }
    }

    /// Attaches an explicit key, overriding any key lifted from the attrs.
    pub fn keyed(mut self, key: impl Into<Key>) -> Self {
        match &mut self {
            VNode::Element(e) => e.key = Some(key.into()),
            VNode::Component(c) => c.key = Some(key.into()),
            _ => {}
        }
        self
    }

    /// Attaches a [`NodeRef`] to an element description.
    pub fn with_node_ref(mut self, node_ref: &NodeRef) -> Self {
        if let VNode::Element(e) = &mut self {
            e.node_ref = Some(node_ref.clone());
        }
        self
    }

    /// Attaches an [`InstanceRef`] to a component description.
    pub fn with_instance_ref(mut self, instance_ref: &InstanceRef) -> Self {
        if let VNode::Component(c) = &mut self {
            c.instance_ref = Some(instance_ref.clone());
        }
        self
    }
}

/// Builds a text description node; numbers and other printables stringify.
pub fn text(value: impl ToString) -> VNode {
    VNode::Text(value.to_string())
}

fn take_key(attrs: &mut AttrMap) -> Option<Key> {
    attrs.remove("key").map(|v| v.to_attr_string())
}

/// Normalizes an element's children list: `Empty` holes become empty text,
/// and adjacent textual children coalesce into a single entry. Component
/// children lists are handed to the component untouched, so this runs only
/// for host tags.
fn normalize_element_children(raw: Vec<VNode>) -> Vec<VNode> {
    let mut children: Vec<VNode> = Vec::with_capacity(raw.len());
    let mut last_simple = false;
    for child in raw {
        let simple = matches!(child, VNode::Empty | VNode::Text(_));
        let piece = match child {
            VNode::Empty => String::new(),
            VNode::Text(t) => t,
            other => {
                children.push(other);
                last_simple = false;
                continue;
            }
        };
        if last_simple {
            if let Some(VNode::Text(prev)) = children.last_mut() {
                prev.push_str(&piece);
            }
        } else {
            children.push(VNode::Text(piece));
        }
        last_simple = simple;
    }
    children
}

/// Builds a host-tag description node.
///
/// A `"key"` entry in `attrs` is lifted into the node's key rather than kept
/// as a host attribute.
pub fn h(tag: impl Into<String>, mut attrs: AttrMap, children: Vec<VNode>) -> VNode {
    let key = take_key(&mut attrs);
    VNode::Element(VElement {
        tag: tag.into(),
        attrs,
        children: normalize_element_children(children),
        key,
        node_ref: None,
    })
}

/// Builds a component description node for the component type `C`.
pub fn component<C: Component + ComponentInit + 'static>(
    mut attrs: AttrMap,
    children: Vec<VNode>,
) -> VNode {
    let key = take_key(&mut attrs);
    VNode::Component(VComponent {
        kind: ComponentKind::of::<C>(),
        attrs,
        children,
        key,
        instance_ref: None,
    })
}

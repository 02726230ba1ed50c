use std::fmt;

use crate::host::HostNodeId;
use crate::value::AttrMap;
use crate::vnode::{ComponentKind, InstanceRef, Key, VNode};

/// Identifier of a mounted (or retired) component instance in the runtime's
/// instance arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Inputs a component receives from its parent: the attribute map of its
/// description node plus the raw (un-normalized) child descriptions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    pub attrs: AttrMap,
    pub children: Vec<VNode>,
}

impl Props {
    pub fn new(attrs: AttrMap, children: Vec<VNode>) -> Self {
        Self { attrs, children }
    }
}

/// How a props application is allowed to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Render immediately, reusing the retained base in place.
    Sync,
    /// Mark dirty and defer to the render queue.
    Async,
    /// Render immediately, skipping the `should_update` gate.
    Force,
    /// Apply props without rendering at all.
    Skip,
}

type RenderCallback = Box<dyn FnOnce()>;

enum ScopeOp {
    SetState {
        patch: AttrMap,
        callback: Option<RenderCallback>,
    },
    ForceUpdate {
        callback: Option<RenderCallback>,
    },
}

/// Handle a lifecycle hook uses to request state changes. Requests are
/// buffered and applied by the runtime after the hook returns, so a hook
/// never re-enters the instance it is running inside.
#[derive(Default)]
pub struct Scope {
    ops: Vec<ScopeOp>,
}

impl Scope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Merges `patch` into the instance state and schedules a re-render.
    pub fn set_state(&mut self, patch: AttrMap) {
        self.ops.push(ScopeOp::SetState {
            patch,
            callback: None,
        });
    }

    /// Like [`set_state`](Self::set_state); `callback` runs once the
    /// resulting render has been applied.
    pub fn set_state_then(&mut self, patch: AttrMap, callback: impl FnOnce() + 'static) {
        self.ops.push(ScopeOp::SetState {
            patch,
            callback: Some(Box::new(callback)),
        });
    }

    /// Schedules an immediate re-render that bypasses `should_update`.
    pub fn force_update(&mut self) {
        self.ops.push(ScopeOp::ForceUpdate { callback: None });
    }

    pub fn force_update_then(&mut self, callback: impl FnOnce() + 'static) {
        self.ops.push(ScopeOp::ForceUpdate {
            callback: Some(Box::new(callback)),
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn take(
        &mut self,
    ) -> Vec<(Option<AttrMap>, Option<RenderCallback>)> {
        self.ops
            .drain(..)
            .map(|op| match op {
                ScopeOp::SetState { patch, callback } => (Some(patch), callback),
                ScopeOp::ForceUpdate { callback } => (None, callback),
            })
            .collect()
    }
}

/// Stateful unit of the tree. All hooks have no-op defaults; `render` is the
/// only required method and must not mutate anything outside the [`Scope`].
#[allow(unused_variables)]
pub trait Component {
    fn render(&self, props: &Props, state: &AttrMap, context: &AttrMap) -> VNode;

    /// Runs right before the first render of this instance.
    fn before_mount(&mut self, scope: &mut Scope) {}

    /// Runs after the instance's output is attached to the tree. Fires for
    /// descendants before ancestors.
    fn mounted(&mut self, scope: &mut Scope) {}

    /// Runs when new props arrive on an already-mounted instance, before the
    /// update renders.
    fn receive_props(&mut self, next_props: &Props, next_context: &AttrMap, scope: &mut Scope) {}

    /// Gate for non-forced updates. Returning `false` skips the render but
    /// still commits the new props and state.
    fn should_update(
        &mut self,
        next_props: &Props,
        next_state: &AttrMap,
        next_context: &AttrMap,
    ) -> bool {
        true
    }

    fn before_update(
        &mut self,
        next_props: &Props,
        next_state: &AttrMap,
        next_context: &AttrMap,
        scope: &mut Scope,
    ) {
    }

    fn after_update(
        &mut self,
        prev_props: &Props,
        prev_state: &AttrMap,
        prev_context: &AttrMap,
        scope: &mut Scope,
    ) {
    }

    /// Runs before the instance's output is torn down.
    fn before_unmount(&mut self, scope: &mut Scope) {}

    /// Extra context entries merged over the inherited context for this
    /// instance's subtree.
    fn child_context(
        &self,
        props: &Props,
        state: &AttrMap,
        context: &AttrMap,
    ) -> Option<AttrMap> {
        None
    }
}

/// Constructor seam used by [`ComponentKind`](crate::vnode::ComponentKind)
/// to build fresh logic values.
pub trait ComponentInit: Sized {
    fn init(props: &Props, context: &AttrMap) -> Self;

    /// State the instance starts with before its first render.
    fn initial_state(props: &Props, context: &AttrMap) -> AttrMap {
        let _ = (props, context);
        AttrMap::default()
    }
}

/// Bookkeeping record for one mounted component. The boxed logic is taken
/// out of `logic` for the duration of a hook call and restored afterwards.
pub struct ComponentInstance {
    pub(crate) id: ComponentId,
    pub(crate) kind: ComponentKind,
    pub(crate) logic: Option<Box<dyn Component>>,

    pub(crate) props: Props,
    pub(crate) state: AttrMap,
    pub(crate) context: AttrMap,
    pub(crate) key: Option<Key>,

    /// Outermost host node currently rendered by this instance.
    pub(crate) base: Option<HostNodeId>,
    /// Detached host subtree available for reuse on the next render.
    pub(crate) next_base: Option<HostNodeId>,

    /// Pre-update snapshots, taken lazily on the first change since the
    /// last committed render.
    pub(crate) prev_props: Option<Props>,
    pub(crate) prev_state: Option<AttrMap>,
    pub(crate) prev_context: Option<AttrMap>,

    /// Higher-order chain links. `parent_component` owns this instance's
    /// description; `child_component` renders on this instance's behalf.
    pub(crate) parent_component: Option<ComponentId>,
    pub(crate) child_component: Option<ComponentId>,

    pub(crate) instance_ref: Option<InstanceRef>,
    pub(crate) render_callbacks: Vec<RenderCallback>,

    pub(crate) dirty: bool,
    /// Set while props are being applied; re-entrant renders are dropped.
    pub(crate) locked: bool,
}

impl ComponentInstance {
    pub(crate) fn new(
        id: ComponentId,
        kind: ComponentKind,
        logic: Box<dyn Component>,
        state: AttrMap,
        context: AttrMap,
    ) -> Self {
        Self {
            id,
            kind,
            logic: Some(logic),
            props: Props::default(),
            state,
            context,
            key: None,
            base: None,
            next_base: None,
            prev_props: None,
            prev_state: None,
            prev_context: None,
            parent_component: None,
            child_component: None,
            instance_ref: None,
            render_callbacks: Vec::new(),
            dirty: false,
            locked: false,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn base(&self) -> Option<HostNodeId> {
        self.base
    }

    pub fn state(&self) -> &AttrMap {
        &self.state
    }

    pub fn props(&self) -> &Props {
        &self.props
    }
}

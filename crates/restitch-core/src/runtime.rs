use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;

use crate::collections::map::HashMap;
use crate::component::{Component, ComponentId, ComponentInstance, RenderMode, Scope};
use crate::host::{HostBackend, HostError, HostNodeId};
use crate::queue::{NoopScheduler, RenderQueue, RenderScheduler};
use crate::recycler::RecyclerPool;
use crate::value::AttrMap;
use crate::vnode::{Key, NodeRef, VNode};

/// Per-node sidecar the reconciler keeps alongside the host tree: the last
/// attribute snapshot it applied, the key the node was matched under, and
/// the ref cell currently bound to it. A node with no sidecar has never been
/// reconciled, which is what switches the first pass into hydration.
#[derive(Default)]
pub(crate) struct NodeState {
    pub(crate) attrs: AttrMap,
    pub(crate) key: Option<Key>,
    pub(crate) node_ref: Option<NodeRef>,
}

/// Reconciliation engine state: the host tree, the component instance
/// arena, the recycler pool, the render queue and the retained-tree side
/// tables. All work is single-threaded and runs to completion.
pub struct Runtime<H: HostBackend> {
    pub(crate) host: H,
    pub(crate) instances: Vec<ComponentInstance>,
    pub(crate) pool: RecyclerPool,
    pub(crate) queue: RenderQueue,
    pub(crate) mounts: VecDeque<ComponentId>,
    pub(crate) node_state: HashMap<HostNodeId, NodeState>,
    /// Outermost component instance rendered into each host node.
    pub(crate) owners: HashMap<HostNodeId, ComponentId>,

    pub(crate) diff_level: u32,
    pub(crate) svg_mode: bool,
    pub(crate) hydrating: bool,
    /// When set, queued props pushes from parents render immediately
    /// instead of waiting for the queue.
    pub(crate) sync_component_updates: bool,
}

impl<H: HostBackend> Runtime<H> {
    pub fn new(host: H) -> Self {
        Self::with_scheduler(host, Rc::new(NoopScheduler))
    }

    pub fn with_scheduler(host: H, scheduler: Rc<dyn RenderScheduler>) -> Self {
        Self {
            host,
            instances: Vec::new(),
            pool: RecyclerPool::new(),
            queue: RenderQueue::new(scheduler),
            mounts: VecDeque::new(),
            node_state: HashMap::default(),
            owners: HashMap::default(),
            diff_level: 0,
            svg_mode: false,
            hydrating: false,
            sync_component_updates: true,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn set_sync_component_updates(&mut self, sync: bool) {
        self.sync_component_updates = sync;
    }

    pub fn pool(&self) -> &RecyclerPool {
        &self.pool
    }

    pub fn pending_renders(&self) -> usize {
        self.queue.len()
    }

    /// Outermost host node currently rendered by `id`, if it is mounted.
    pub fn component_base(&self, id: ComponentId) -> Option<HostNodeId> {
        self.instances[id.0].base
    }

    pub fn component_state(&self, id: ComponentId) -> &AttrMap {
        &self.instances[id.0].state
    }

    /// Mounts `vnode` into `parent`, appending its output there.
    pub fn render(&mut self, vnode: &VNode, parent: HostNodeId) -> Result<HostNodeId, HostError> {
        self.render_into(vnode, parent, None)
    }

    /// Like [`render`](Self::render), but reconciles against `merge` (an
    /// existing child of `parent`) instead of building from scratch. A
    /// merge target that was never reconciled before is hydrated in place.
    pub fn render_into(
        &mut self,
        vnode: &VNode,
        parent: HostNodeId,
        merge: Option<HostNodeId>,
    ) -> Result<HostNodeId, HostError> {
        trace!("root render into {parent}");
        self.diff(merge, vnode, &AttrMap::default(), false, Some(parent), false)
    }

    /// Flushes the render queue: every instance still dirty is re-rendered,
    /// most recently dirtied first. Instances dirtied during the flush land
    /// in a fresh queue and wake the scheduler again.
    pub fn rerender(&mut self) -> Result<(), HostError> {
        let mut list = self.queue.take();
        while let Some(id) = list.pop() {
            if self.instances[id.0].dirty {
                self.render_component(id, RenderMode::Sync, false, false)?;
            }
        }
        Ok(())
    }

    /// Merges `patch` into the instance's state and schedules a re-render.
    pub fn set_state(&mut self, id: ComponentId, patch: AttrMap) {
        self.set_state_inner(id, patch, None);
    }

    /// Like [`set_state`](Self::set_state); `callback` runs once the
    /// resulting render has been applied.
    pub fn set_state_then(
        &mut self,
        id: ComponentId,
        patch: AttrMap,
        callback: impl FnOnce() + 'static,
    ) {
        self.set_state_inner(id, patch, Some(Box::new(callback)));
    }

    fn set_state_inner(
        &mut self,
        id: ComponentId,
        patch: AttrMap,
        callback: Option<Box<dyn FnOnce()>>,
    ) {
        let inst = &mut self.instances[id.0];
        if inst.prev_state.is_none() {
            inst.prev_state = Some(inst.state.clone());
        }
        inst.state.extend(patch);
        if let Some(cb) = callback {
            inst.render_callbacks.push(cb);
        }
        self.enqueue_render(id);
    }

    /// Re-renders `id` immediately, bypassing its `should_update` gate.
    pub fn force_update(&mut self, id: ComponentId) -> Result<(), HostError> {
        self.render_component(id, RenderMode::Force, false, false)
    }

    pub(crate) fn enqueue_render(&mut self, id: ComponentId) {
        let inst = &mut self.instances[id.0];
        if !inst.dirty {
            inst.dirty = true;
            self.queue.push(id);
        }
    }

    /// Drains the mounted-hook queue. Instances finish rendering inner
    /// first, so the drain order is descendant before ancestor.
    pub(crate) fn flush_mounts(&mut self) -> Result<(), HostError> {
        while let Some(id) = self.mounts.pop_front() {
            trace!("mounted {id}");
            self.run_hook(id, (), |logic, scope| logic.mounted(scope))?;
        }
        Ok(())
    }

    /// Runs one lifecycle hook with the instance's logic taken out of its
    /// slot, then applies whatever the hook asked for through its [`Scope`].
    /// Returns `default` if the instance has no logic to run.
    pub(crate) fn run_hook<R>(
        &mut self,
        id: ComponentId,
        default: R,
        f: impl FnOnce(&mut dyn Component, &mut Scope) -> R,
    ) -> Result<R, HostError> {
        let Some(mut logic) = self.instances[id.0].logic.take() else {
            return Ok(default);
        };
        let mut scope = Scope::new();
        let out = f(logic.as_mut(), &mut scope);
        self.instances[id.0].logic = Some(logic);
        if !scope.is_empty() {
            self.apply_scope(id, scope)?;
        }
        Ok(out)
    }

    fn apply_scope(&mut self, id: ComponentId, mut scope: Scope) -> Result<(), HostError> {
        for (patch, callback) in scope.take() {
            match patch {
                Some(patch) => {
                    self.set_state_inner(id, patch, callback);
                }
                None => {
                    if let Some(cb) = callback {
                        self.instances[id.0].render_callbacks.push(cb);
                    }
                    self.render_component(id, RenderMode::Force, false, false)?;
                }
            }
        }
        Ok(())
    }
}

//! Component rendering: props application, the render pipeline with its
//! update gates, higher-order chains, and unmounting.

use log::trace;

use crate::component::{ComponentId, ComponentInstance, Props, RenderMode};
use crate::host::{HostBackend, HostError, HostNodeId};
use crate::runtime::Runtime;
use crate::value::AttrMap;
use crate::vnode::{ComponentKind, InstanceRef, Key, VComponent, VNode};

impl<H: HostBackend> Runtime<H> {
    /// Allocates a fresh instance for `kind`, transplanting a retired base
    /// from the recycler pool when one is available.
    pub(crate) fn create_component(
        &mut self,
        kind: ComponentKind,
        props: &Props,
        context: &AttrMap,
    ) -> ComponentId {
        let id = ComponentId(self.instances.len());
        let logic = kind.instantiate(props, context);
        let state = kind.initial_state(props, context);
        let mut inst = ComponentInstance::new(id, kind, logic, state, context.clone());
        if let Some(next_base) = self.pool.acquire(kind) {
            inst.next_base = next_base;
        }
        trace!("created {id} ({})", kind.name());
        self.instances.push(inst);
        id
    }

    /// Applies incoming props to an instance and dispatches the requested
    /// render. Re-entrant applications on a locked instance are dropped.
    pub(crate) fn set_component_props(
        &mut self,
        id: ComponentId,
        props: Props,
        key: Option<Key>,
        instance_ref: Option<InstanceRef>,
        mode: RenderMode,
        context: AttrMap,
        mount_all: bool,
    ) -> Result<(), HostError> {
        if self.instances[id.0].locked {
            return Ok(());
        }
        self.instances[id.0].locked = true;

        self.instances[id.0].instance_ref = instance_ref;
        self.instances[id.0].key = key;

        if self.instances[id.0].base.is_none() || mount_all {
            self.run_hook(id, (), |logic, scope| logic.before_mount(scope))?;
        } else {
            let (p, c) = (props.clone(), context.clone());
            self.run_hook(id, (), move |logic, scope| {
                logic.receive_props(&p, &c, scope)
            })?;
        }

        {
            let inst = &mut self.instances[id.0];
            if context != inst.context {
                if inst.prev_context.is_none() {
                    inst.prev_context = Some(inst.context.clone());
                }
                inst.context = context;
            }
            if inst.prev_props.is_none() {
                inst.prev_props = Some(inst.props.clone());
            }
            inst.props = props;
            inst.locked = false;
        }

        if mode != RenderMode::Skip {
            if mode == RenderMode::Sync
                || self.sync_component_updates
                || self.instances[id.0].base.is_none()
            {
                self.render_component(id, RenderMode::Sync, mount_all, false)?;
            } else {
                self.enqueue_render(id);
            }
        }

        if let Some(r) = &self.instances[id.0].instance_ref {
            r.set(id);
        }
        Ok(())
    }

    /// Renders one instance: gates the update, renders the description,
    /// reconciles it into the host tree (or forwards to a higher-order
    /// child), splices a changed base into place, and fires the post-render
    /// hooks and callbacks.
    pub(crate) fn render_component(
        &mut self,
        id: ComponentId,
        mode: RenderMode,
        mount_all: bool,
        is_child: bool,
    ) -> Result<(), HostError> {
        if self.instances[id.0].locked {
            return Ok(());
        }

        let (props, state, context) = {
            let inst = &self.instances[id.0];
            (inst.props.clone(), inst.state.clone(), inst.context.clone())
        };
        let (previous_props, previous_state, previous_context) = {
            let inst = &self.instances[id.0];
            (
                inst.prev_props.clone().unwrap_or_else(|| props.clone()),
                inst.prev_state.clone().unwrap_or_else(|| state.clone()),
                inst.prev_context.clone().unwrap_or_else(|| context.clone()),
            )
        };
        let is_update = self.instances[id.0].base.is_some();
        let next_base = self.instances[id.0].next_base;
        let initial_base = self.instances[id.0].base.or(next_base);
        let initial_child = self.instances[id.0].child_component;

        let mut skip = false;
        if is_update {
            // The gating hooks observe the committed values on the instance
            // while receiving the incoming ones as arguments.
            {
                let inst = &mut self.instances[id.0];
                inst.props = previous_props.clone();
                inst.state = previous_state.clone();
                inst.context = previous_context.clone();
            }
            if mode != RenderMode::Force {
                let (p, s, c) = (props.clone(), state.clone(), context.clone());
                skip = !self.run_hook(id, true, move |logic, _| {
                    logic.should_update(&p, &s, &c)
                })?;
            }
            if !skip {
                let (p, s, c) = (props.clone(), state.clone(), context.clone());
                self.run_hook(id, (), move |logic, scope| {
                    logic.before_update(&p, &s, &c, scope)
                })?;
            }
            {
                let inst = &mut self.instances[id.0];
                inst.props = props.clone();
                inst.state = state.clone();
                inst.context = context.clone();
            }
        }

        {
            let inst = &mut self.instances[id.0];
            inst.prev_props = None;
            inst.prev_state = None;
            inst.prev_context = None;
            inst.next_base = None;
            inst.dirty = false;
        }

        if !skip {
            let (p, s, c) = (props.clone(), state.clone(), context.clone());
            let rendered = self.run_hook(id, VNode::Empty, move |logic, _| {
                logic.render(&p, &s, &c)
            })?;

            // Context handed to the subtree may be extended by the instance.
            let mut context = context;
            let (p, s, c) = (props.clone(), state.clone(), context.clone());
            if let Some(extra) = self.run_hook(id, None, move |logic, _| {
                logic.child_context(&p, &s, &c)
            })? {
                context.extend(extra);
            }

            let mut to_unmount: Option<ComponentId> = None;
            let mut child_link_same = false;
            let mut base: Option<HostNodeId> = None;

            match rendered {
                VNode::Component(vc) => {
                    let child_props = Props::new(vc.attrs.clone(), vc.children.clone());

                    let mut matched: Option<ComponentId> = None;
                    if let Some(cid) = initial_child {
                        let ci = &self.instances[cid.0];
                        if ci.kind == vc.kind && ci.key == vc.key {
                            matched = Some(cid);
                        }
                    }

                    let cid = match matched {
                        Some(cid) => {
                            child_link_same = true;
                            self.set_component_props(
                                cid,
                                child_props,
                                vc.key.clone(),
                                vc.instance_ref.clone(),
                                RenderMode::Async,
                                context.clone(),
                                false,
                            )?;
                            cid
                        }
                        None => {
                            to_unmount = initial_child;

                            let cid = self.create_component(vc.kind, &child_props, &context);
                            {
                                let ci = &mut self.instances[cid.0];
                                if ci.next_base.is_none() {
                                    ci.next_base = next_base;
                                }
                                ci.parent_component = Some(id);
                            }
                            self.instances[id.0].child_component = Some(cid);
                            self.set_component_props(
                                cid,
                                child_props,
                                vc.key.clone(),
                                vc.instance_ref.clone(),
                                RenderMode::Skip,
                                context.clone(),
                                false,
                            )?;
                            self.render_component(cid, RenderMode::Sync, mount_all, true)?;
                            cid
                        }
                    };
                    base = self.instances[cid.0].base;
                }
                rendered => {
                    let mut cbase = initial_base;

                    // A host-typed result dissolves any higher-order link.
                    to_unmount = initial_child;
                    if to_unmount.is_some() {
                        cbase = None;
                        self.instances[id.0].child_component = None;
                    }

                    if initial_base.is_some() || mode == RenderMode::Sync {
                        if let Some(cb) = cbase {
                            self.owners.remove(&cb);
                        }
                        let parent = match initial_base {
                            Some(b) => self.host.parent(b)?,
                            None => None,
                        };
                        base = Some(self.diff(
                            cbase,
                            &rendered,
                            &context,
                            mount_all || !is_update,
                            parent,
                            true,
                        )?);
                    }
                }
            }

            // A base swap splices the new subtree over the old one in place.
            if let (Some(ib), Some(b)) = (initial_base, base) {
                if b != ib && !child_link_same {
                    if let Some(bp) = self.host.parent(ib)? {
                        if b != bp {
                            self.host.replace_child(bp, b, ib)?;
                            if to_unmount.is_none() {
                                self.owners.remove(&ib);
                                self.recollect_node_tree(ib, false)?;
                            }
                        }
                    }
                }
            }

            if let Some(u) = to_unmount {
                self.unmount_component(u)?;
            }

            self.instances[id.0].base = base;
            if let Some(b) = base {
                if !is_child {
                    // Every ancestor in a higher-order chain shares the
                    // outermost base; the outermost ancestor owns the node.
                    let mut root = id;
                    while let Some(p) = self.instances[root.0].parent_component {
                        root = p;
                        self.instances[root.0].base = base;
                    }
                    self.owners.insert(b, root);
                }
            }
        }

        if !is_update || mount_all {
            self.mounts.push_back(id);
        } else if !skip {
            let (pp, ps, pc) = (previous_props, previous_state, previous_context);
            self.run_hook(id, (), move |logic, scope| {
                logic.after_update(&pp, &ps, &pc, scope)
            })?;
        }

        // Callbacks registered with a state change run in request order.
        let callbacks: Vec<_> = self.instances[id.0].render_callbacks.drain(..).collect();
        for cb in callbacks {
            cb();
        }

        if self.diff_level == 0 && !is_child {
            self.flush_mounts()?;
        }
        Ok(())
    }

    /// Resolves a component description against a retained node: forwards
    /// props to the owning instance when the types line up, otherwise
    /// mounts a fresh instance (seeding it with the retained node as a
    /// reusable base) and tears the old output down.
    pub(crate) fn build_component_from_vnode(
        &mut self,
        dom: Option<HostNodeId>,
        vnode: &VComponent,
        context: &AttrMap,
        mount_all: bool,
    ) -> Result<HostNodeId, HostError> {
        let original = dom.and_then(|d| self.owners.get(&d).copied());
        let is_direct_owner =
            original.is_some_and(|cid| self.instances[cid.0].kind == vnode.kind);

        let mut c = original;
        let mut is_owner = is_direct_owner;
        while let Some(cid) = c {
            if is_owner {
                break;
            }
            match self.instances[cid.0].parent_component {
                Some(p) => {
                    c = Some(p);
                    is_owner = self.instances[p.0].kind == vnode.kind;
                }
                None => c = None,
            }
        }

        let props = Props::new(vnode.attrs.clone(), vnode.children.clone());

        if let Some(cid) = c.filter(|_| is_owner) {
            if !mount_all || self.instances[cid.0].child_component.is_some() {
                self.set_component_props(
                    cid,
                    props,
                    vnode.key.clone(),
                    vnode.instance_ref.clone(),
                    RenderMode::Async,
                    context.clone(),
                    mount_all,
                )?;
                return self.instances[cid.0]
                    .base
                    .ok_or(HostError::MissingBase { component: cid.0 });
            }
        }

        let mut old_dom = dom;
        let mut dom = dom;
        if let Some(orig) = original {
            if !is_direct_owner {
                self.unmount_component(orig)?;
                dom = None;
                old_dom = None;
            }
        }

        let cid = self.create_component(vnode.kind, &props, context);
        if let Some(d) = dom {
            if self.instances[cid.0].next_base.is_none() {
                // Handing the retained node over as the next base reuses it
                // directly, so skip the recollect below.
                self.instances[cid.0].next_base = Some(d);
                old_dom = None;
            }
        }
        self.set_component_props(
            cid,
            props,
            vnode.key.clone(),
            vnode.instance_ref.clone(),
            RenderMode::Sync,
            context.clone(),
            mount_all,
        )?;
        let base = self.instances[cid.0]
            .base
            .ok_or(HostError::MissingBase { component: cid.0 })?;

        if let Some(old) = old_dom {
            if old != base {
                self.owners.remove(&old);
                self.recollect_node_tree(old, false)?;
            }
        }
        Ok(base)
    }

    /// Tears an instance down. Its outermost base is detached, parked on
    /// the instance as a reusable next base, and retired into the pool for
    /// the next mount of the same kind.
    pub(crate) fn unmount_component(&mut self, id: ComponentId) -> Result<(), HostError> {
        trace!("unmounting {id}");
        let base = self.instances[id.0].base;
        self.instances[id.0].locked = true;

        self.run_hook(id, (), |logic, scope| logic.before_unmount(scope))?;
        self.instances[id.0].base = None;

        let inner = self.instances[id.0].child_component;
        if let Some(inner) = inner {
            self.unmount_component(inner)?;
        } else if let Some(base) = base {
            if let Some(state) = self.node_state.get(&base) {
                if let Some(r) = &state.node_ref {
                    r.clear();
                }
            }
            self.owners.remove(&base);
            self.instances[id.0].next_base = Some(base);
            self.host.detach(base)?;
            let kind = self.instances[id.0].kind;
            self.pool.retire(kind, Some(base));
            self.remove_children(base)?;
        }

        if let Some(r) = self.instances[id.0].instance_ref.take() {
            r.clear();
        }
        self.instances[id.0].dirty = false;
        Ok(())
    }
}

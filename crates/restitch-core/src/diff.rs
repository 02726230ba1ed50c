//! The recursive diff: reconciles one description node against one retained
//! host node, reusing, patching, repositioning or rebuilding as needed.

use log::trace;
use smallvec::SmallVec;

use crate::collections::map::HashMap;
use crate::host::{HostBackend, HostError, HostNodeId};
use crate::runtime::{NodeState, Runtime};
use crate::value::AttrMap;
use crate::vnode::{Key, VElement, VNode};

impl<H: HostBackend> Runtime<H> {
    /// Entry point for one reconciliation pass. `dom` is the retained node
    /// to reconcile against (if any); the result is appended to `parent`
    /// unless it already sits there. `component_root` marks passes started
    /// by a component rendering its own output, which defer mounted-hook
    /// flushing to the outermost caller.
    pub(crate) fn diff(
        &mut self,
        dom: Option<HostNodeId>,
        vnode: &VNode,
        context: &AttrMap,
        mount_all: bool,
        parent: Option<HostNodeId>,
        component_root: bool,
    ) -> Result<HostNodeId, HostError> {
        self.diff_level += 1;
        if self.diff_level == 1 {
            // An outermost pass decides namespace mode from where the output
            // lands, and hydrates when handed a node it has never seen.
            self.svg_mode = match parent {
                Some(p) => self.host.is_svg(p)?,
                None => false,
            };
            self.hydrating = matches!(dom, Some(d) if !self.node_state.contains_key(&d));
        }

        let ret = self.idiff(dom, vnode, context, mount_all, component_root)?;

        if let Some(parent) = parent {
            if self.host.parent(ret)? != Some(parent) {
                self.host.append_child(parent, ret)?;
            }
        }

        self.diff_level -= 1;
        if self.diff_level == 0 {
            self.hydrating = false;
            if !component_root {
                self.flush_mounts()?;
            }
        }
        Ok(ret)
    }

    fn idiff(
        &mut self,
        dom: Option<HostNodeId>,
        vnode: &VNode,
        context: &AttrMap,
        mount_all: bool,
        component_root: bool,
    ) -> Result<HostNodeId, HostError> {
        match vnode {
            // Empty descriptions render as empty text so sibling indices
            // stay stable.
            VNode::Empty => self.idiff_text(dom, "", component_root),
            VNode::Text(text) => self.idiff_text(dom, text, component_root),
            VNode::Component(vc) => self.build_component_from_vnode(dom, vc, context, mount_all),
            VNode::Element(ve) => self.idiff_element(dom, ve, context, mount_all),
        }
    }

    fn idiff_text(
        &mut self,
        dom: Option<HostNodeId>,
        text: &str,
        component_root: bool,
    ) -> Result<HostNodeId, HostError> {
        let mut reusable = None;
        if let Some(d) = dom {
            if self.host.tag(d)?.is_none()
                && self.host.parent(d)?.is_some()
                && (!self.owners.contains_key(&d) || component_root)
            {
                reusable = Some(d);
            }
        }
        let out = if let Some(d) = reusable {
            if self.host.text(d)? != text {
                self.host.set_text(d, text)?;
            }
            d
        } else {
            let out = self.host.create_text(text);
            if let Some(d) = dom {
                if let Some(p) = self.host.parent(d)? {
                    self.host.replace_child(p, out, d)?;
                }
                self.recollect_node_tree(d, true)?;
            }
            out
        };
        self.node_state.entry(out).or_default();
        Ok(out)
    }

    fn idiff_element(
        &mut self,
        dom: Option<HostNodeId>,
        ve: &VElement,
        context: &AttrMap,
        mount_all: bool,
    ) -> Result<HostNodeId, HostError> {
        let prev_svg = self.svg_mode;
        if ve.tag.eq_ignore_ascii_case("svg") {
            self.svg_mode = true;
        } else if ve.tag.eq_ignore_ascii_case("foreignObject") {
            self.svg_mode = false;
        }

        // Reuse the retained node only when the tag matches and no component
        // claims it; otherwise rebuild, carrying the children across so the
        // child pass can still reclaim them.
        let mut reuse = None;
        if let Some(d) = dom {
            if self.is_named_node(d, &ve.tag)? && !self.owners.contains_key(&d) {
                reuse = Some(d);
            }
        }
        let out = match reuse {
            Some(d) => d,
            None => {
                let fresh = self.host.create_element(&ve.tag, self.svg_mode);
                if let Some(d) = dom {
                    trace!("replacing {d} with <{}> {fresh}", ve.tag);
                    while let Some(fc) = self.host.first_child(d)? {
                        self.host.append_child(fresh, fc)?;
                    }
                    if let Some(p) = self.host.parent(d)? {
                        self.host.replace_child(p, fresh, d)?;
                    }
                    self.recollect_node_tree(d, true)?;
                }
                fresh
            }
        };

        // First contact with a pre-existing node seeds the sidecar from the
        // host's live attributes so the attribute pass diffs against them.
        if !self.node_state.contains_key(&out) {
            let attrs = self.host.attributes(out)?;
            self.node_state.insert(
                out,
                NodeState {
                    attrs,
                    key: None,
                    node_ref: None,
                },
            );
        }

        let fc = self.host.first_child(out)?;

        // Fast path: a lone text description over a lone retained text child
        // mutates in place without the full child pass.
        let mut handled = false;
        if !self.hydrating && ve.children.len() == 1 {
            if let (VNode::Text(t), Some(fc)) = (&ve.children[0], fc) {
                if self.host.tag(fc)?.is_none() && self.host.next_sibling(fc)?.is_none() {
                    if self.host.text(fc)? != *t {
                        self.host.set_text(fc, t)?;
                    }
                    handled = true;
                }
            }
        }
        if !handled && (!ve.children.is_empty() || fc.is_some()) {
            self.inner_diff_node(out, &ve.children, context, mount_all, self.hydrating)?;
        }

        self.diff_attributes(out, &ve.attrs)?;

        if let Some(state) = self.node_state.get_mut(&out) {
            state.key = ve.key.clone();
            if let Some(prev) = &state.node_ref {
                if ve.node_ref.as_ref() != Some(prev) {
                    prev.clear();
                }
            }
            state.node_ref = ve.node_ref.clone();
            if let Some(r) = &state.node_ref {
                r.set(out);
            }
        }

        self.svg_mode = prev_svg;
        Ok(out)
    }

    /// Reconciles a children list against the retained children of `dom`.
    /// Keyed descriptions only ever match their keyed counterpart; unkeyed
    /// ones claim the first type-compatible leftover.
    fn inner_diff_node(
        &mut self,
        dom: HostNodeId,
        vchildren: &[VNode],
        context: &AttrMap,
        mount_all: bool,
        is_hydrating: bool,
    ) -> Result<(), HostError> {
        let len = self.host.child_count(dom)?;
        let vlen = vchildren.len();
        let mut keyed: HashMap<Key, HostNodeId> = HashMap::default();
        let mut children: SmallVec<[Option<HostNodeId>; 8]> = SmallVec::new();
        let mut min = 0usize;
        let mut children_len = 0usize;

        if len != 0 {
            for i in 0..len {
                let Some(child) = self.host.child_at(dom, i)? else {
                    break;
                };
                let has_sidecar = self.node_state.contains_key(&child);
                let key = if vlen != 0 && has_sidecar {
                    match self.owners.get(&child) {
                        Some(&owner) => self.instances[owner.0].key.clone(),
                        None => self.node_state.get(&child).and_then(|s| s.key.clone()),
                    }
                } else {
                    None
                };
                if let Some(key) = key {
                    keyed.insert(key, child);
                } else {
                    // Unkeyed candidates: anything already reconciled, plus
                    // (while hydrating) non-blank pre-existing text.
                    let include = has_sidecar
                        || if self.host.tag(child)?.is_none() {
                            if is_hydrating {
                                !self.host.text(child)?.trim().is_empty()
                            } else {
                                true
                            }
                        } else {
                            is_hydrating
                        };
                    if include {
                        children.push(Some(child));
                    }
                }
            }
            children_len = children.len();
        }

        for (i, vchild) in vchildren.iter().enumerate() {
            let mut child: Option<HostNodeId> = None;

            if let Some(key) = vchild.key() {
                if let Some(c) = keyed.remove(key) {
                    child = Some(c);
                }
            } else if min < children_len {
                for j in min..children_len {
                    let Some(c) = children[j] else { continue };
                    if self.is_same_node_type(c, vchild, is_hydrating)? {
                        child = Some(c);
                        children[j] = None;
                        if j == children_len - 1 {
                            children_len -= 1;
                        }
                        if j == min {
                            min += 1;
                        }
                        break;
                    }
                }
            }

            let child = self.idiff(child, vchild, context, mount_all, false)?;

            // Reposition against the live child list. When the result sits
            // exactly one slot late, dropping the blocking node is cheaper
            // than moving the result.
            let f = self.host.child_at(dom, i)?;
            if child != dom && Some(child) != f {
                match f {
                    None => self.host.append_child(dom, child)?,
                    Some(f) => {
                        if Some(child) == self.host.next_sibling(f)? {
                            self.host.detach(f)?;
                        } else {
                            self.host.insert_before(dom, child, f)?;
                        }
                    }
                }
            }
        }

        let leftovers: Vec<HostNodeId> = keyed.drain().map(|(_, c)| c).collect();
        for c in leftovers {
            self.recollect_node_tree(c, false)?;
        }
        for j in min..children.len() {
            if let Some(c) = children[j].take() {
                self.recollect_node_tree(c, false)?;
            }
        }
        Ok(())
    }

    fn is_named_node(&self, node: HostNodeId, tag: &str) -> Result<bool, HostError> {
        Ok(self
            .host
            .tag(node)?
            .is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    /// Whether a retained node can be patched into `vnode` without being
    /// rebuilt. While hydrating, component descriptions accept any retained
    /// node; text and element matching stays strict.
    pub(crate) fn is_same_node_type(
        &self,
        node: HostNodeId,
        vnode: &VNode,
        hydrating: bool,
    ) -> Result<bool, HostError> {
        match vnode {
            VNode::Empty | VNode::Text(_) => Ok(self.host.tag(node)?.is_none()),
            VNode::Element(ve) => {
                Ok(!self.owners.contains_key(&node) && self.is_named_node(node, &ve.tag)?)
            }
            VNode::Component(vc) => Ok(hydrating
                || self
                    .owners
                    .get(&node)
                    .is_some_and(|id| self.instances[id.0].kind == vc.kind)),
        }
    }

    /// Applies attribute changes against the sidecar snapshot. `value` and
    /// `checked` re-read the live host value, which user input may have
    /// moved since the snapshot.
    fn diff_attributes(&mut self, dom: HostNodeId, attrs: &AttrMap) -> Result<(), HostError> {
        let mut old = match self.node_state.get_mut(&dom) {
            Some(s) => std::mem::take(&mut s.attrs),
            None => AttrMap::default(),
        };
        let svg = self.svg_mode;

        let removed: Vec<String> = old
            .keys()
            .filter(|name| !attrs.contains_key(*name))
            .cloned()
            .collect();
        for name in removed {
            let prev = old.remove(&name);
            self.host.set_attribute(dom, &name, prev.as_ref(), None, svg)?;
        }

        for (name, value) in attrs {
            let changed = match old.get(name) {
                None => true,
                Some(prev) => {
                    if name == "value" || name == "checked" {
                        self.host.attribute(dom, name)?.as_ref() != Some(value)
                    } else {
                        prev != value
                    }
                }
            };
            if changed {
                let prev = old.insert(name.clone(), value.clone());
                self.host
                    .set_attribute(dom, name, prev.as_ref(), Some(value), svg)?;
            }
        }

        if let Some(s) = self.node_state.get_mut(&dom) {
            s.attrs = old;
        }
        Ok(())
    }

    /// Tears a retained subtree down: component-owned nodes unmount their
    /// owner; plain nodes clear their ref, detach (unless `unmount_only`
    /// protects an already-reconciled node) and recurse into children.
    pub(crate) fn recollect_node_tree(
        &mut self,
        node: HostNodeId,
        unmount_only: bool,
    ) -> Result<(), HostError> {
        if let Some(&owner) = self.owners.get(&node) {
            return self.unmount_component(owner);
        }

        let has_sidecar = self.node_state.contains_key(&node);
        if let Some(state) = self.node_state.get(&node) {
            if let Some(r) = &state.node_ref {
                r.clear();
            }
        }
        if !unmount_only || !has_sidecar {
            self.host.detach(node)?;
        }
        self.remove_children(node)
    }

    /// Recollects every child of `node`, back to front so sibling links
    /// stay valid while detaching.
    pub(crate) fn remove_children(&mut self, node: HostNodeId) -> Result<(), HostError> {
        let mut child = self.host.last_child(node)?;
        while let Some(c) = child {
            let next = self.host.prev_sibling(c)?;
            self.recollect_node_tree(c, true)?;
            child = next;
        }
        Ok(())
    }
}

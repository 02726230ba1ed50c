use std::any::TypeId;

use crate::collections::map::HashMap;
use crate::host::HostNodeId;
use crate::vnode::ComponentKind;

/// Pool of retired component bases, bucketed by component kind.
///
/// When an instance unmounts, its detached host subtree is parked here; the
/// next mount of the same kind transplants it as a starting base so the diff
/// can patch instead of rebuild. Buckets never evict.
#[derive(Default)]
pub struct RecyclerPool {
    buckets: HashMap<TypeId, Vec<Option<HostNodeId>>>,
}

impl RecyclerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a retired instance's reusable base. Entries without a base are
    /// still recorded so acquisition order stays faithful.
    pub fn retire(&mut self, kind: ComponentKind, next_base: Option<HostNodeId>) {
        self.buckets.entry(kind.type_id()).or_default().push(next_base);
    }

    /// Takes the most recently retired entry for `kind`, if any. The outer
    /// `Option` is pool hit or miss; the inner one is the transplanted base.
    pub fn acquire(&mut self, kind: ComponentKind) -> Option<Option<HostNodeId>> {
        self.buckets.get_mut(&kind.type_id())?.pop()
    }

    /// Number of retired entries currently pooled for `kind`.
    pub fn retired_count(&self, kind: ComponentKind) -> usize {
        self.buckets.get(&kind.type_id()).map_or(0, Vec::len)
    }
}

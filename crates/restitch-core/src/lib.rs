#![doc = r"Retained-tree reconciliation engine.

Immutable description trees (`VNode`) are diffed against a live host tree
behind a `HostBackend`; stateful components mount, update and unmount as
their descriptions come and go, with a recycler pool and a deduplicating
render queue keeping repeated work cheap."]

pub mod collections;
pub mod component;
pub mod hash;
pub mod host;
pub mod queue;
pub mod recycler;
pub mod runtime;
pub mod value;
pub mod vnode;

mod diff;
mod render;

pub use component::{Component, ComponentId, ComponentInit, Props, RenderMode, Scope};
pub use host::{HostBackend, HostError, HostNodeId, MemoryHost, Mutation};
pub use queue::{NoopScheduler, RenderScheduler};
pub use recycler::RecyclerPool;
pub use runtime::Runtime;
pub use value::{AttrMap, Value};
pub use vnode::{
    component, h, text, ComponentKind, InstanceRef, Key, NodeRef, VComponent, VElement, VNode,
};

#[cfg(test)]
mod tests;

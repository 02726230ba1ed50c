mod component_tests;
mod diff_tests;

use crate::host::{HostBackend, HostNodeId, MemoryHost};
use crate::runtime::Runtime;

/// Fresh runtime with a root container already created and the creation
/// mutation drained away.
fn new_runtime() -> (Runtime<MemoryHost>, HostNodeId) {
    let mut rt = Runtime::new(MemoryHost::new());
    let root = rt.host_mut().create_element("root", false);
    rt.host_mut().take_mutations();
    (rt, root)
}

/// Text content of an element's sole text child.
fn text_of(rt: &Runtime<MemoryHost>, node: HostNodeId) -> String {
    let child = rt
        .host()
        .first_child(node)
        .expect("node exists")
        .expect("node has a child");
    rt.host().text(child).expect("child is text")
}

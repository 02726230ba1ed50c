use std::error::Error;
use std::fmt;

use smallvec::SmallVec;

use crate::value::{AttrMap, Value};

/// Identifier of a retained host node. Ids stay valid while the node is
/// detached; a detached subtree can be re-inserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNodeId(pub usize);

impl fmt::Display for HostNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Missing { id: HostNodeId },
    TypeMismatch { id: HostNodeId, expected: &'static str },
    /// A synchronous component render finished without producing a root
    /// host node.
    MissingBase { component: usize },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "host node {id} does not exist"),
            HostError::TypeMismatch { id, expected } => {
                write!(f, "host node {id} is not a {expected} node")
            }
            HostError::MissingBase { component } => {
                write!(f, "component instance c{component} has no rendered base")
            }
        }
    }
}

impl Error for HostError {}

/// The retained output tree the reconciler mutates.
///
/// `tag` returns `None` for text nodes; every structural query reflects the
/// tree as mutated so far, which the differ relies on when it re-reads child
/// positions mid-pass.
pub trait HostBackend {
    fn create_element(&mut self, tag: &str, is_svg: bool) -> HostNodeId;
    fn create_text(&mut self, text: &str) -> HostNodeId;

    fn tag(&self, id: HostNodeId) -> Result<Option<String>, HostError>;
    fn text(&self, id: HostNodeId) -> Result<String, HostError>;
    fn set_text(&mut self, id: HostNodeId, text: &str) -> Result<(), HostError>;
    fn is_svg(&self, id: HostNodeId) -> Result<bool, HostError>;

    fn parent(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError>;
    fn child_count(&self, id: HostNodeId) -> Result<usize, HostError>;
    fn child_at(&self, id: HostNodeId, index: usize) -> Result<Option<HostNodeId>, HostError>;
    fn first_child(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError>;
    fn last_child(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError>;
    fn next_sibling(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError>;
    fn prev_sibling(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError>;

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;
    fn insert_before(
        &mut self,
        parent: HostNodeId,
        child: HostNodeId,
        before: HostNodeId,
    ) -> Result<(), HostError>;
    fn replace_child(
        &mut self,
        parent: HostNodeId,
        new: HostNodeId,
        old: HostNodeId,
    ) -> Result<(), HostError>;
    /// Removes the node from its parent. The node and its subtree stay
    /// retained and can be re-inserted.
    fn detach(&mut self, id: HostNodeId) -> Result<(), HostError>;

    /// Applies one attribute transition. `new: None` removes the attribute.
    fn set_attribute(
        &mut self,
        id: HostNodeId,
        name: &str,
        old: Option<&Value>,
        new: Option<&Value>,
        is_svg: bool,
    ) -> Result<(), HostError>;
    /// Live attribute read, bypassing any cached snapshot the caller holds.
    fn attribute(&self, id: HostNodeId, name: &str) -> Result<Option<Value>, HostError>;
    fn attributes(&self, id: HostNodeId) -> Result<AttrMap, HostError>;
}

/// One recorded mutation of a [`MemoryHost`]. Tests assert on these to prove
/// what a reconciliation pass actually touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement { id: HostNodeId, tag: String },
    CreateText { id: HostNodeId, text: String },
    SetText { id: HostNodeId, text: String },
    Append { parent: HostNodeId, child: HostNodeId },
    InsertBefore { parent: HostNodeId, child: HostNodeId, before: HostNodeId },
    Replace { parent: HostNodeId, new: HostNodeId, old: HostNodeId },
    Detach { id: HostNodeId },
    SetAttribute { id: HostNodeId, name: String, value: Option<Value> },
}

enum NodeKind {
    Element { tag: String, is_svg: bool, attrs: AttrMap },
    Text(String),
}

struct MemoryNode {
    kind: NodeKind,
    parent: Option<HostNodeId>,
    children: SmallVec<[HostNodeId; 4]>,
}

/// In-memory tree arena. Nodes live in a `Vec` of slots and are never freed;
/// detached subtrees keep their ids so they can serve as recycled bases.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    mutations: Vec<Mutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the mutation log recorded since the previous call.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    fn node(&self, id: HostNodeId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: HostNodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or(HostError::Missing { id })
    }

    fn alloc(&mut self, node: MemoryNode) -> HostNodeId {
        let id = HostNodeId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    fn unlink(&mut self, id: HostNodeId) -> Result<(), HostError> {
        if let Some(parent) = self.node(id)?.parent {
            let siblings = &mut self.node_mut(parent)?.children;
            siblings.retain(|c| *c != id);
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn render_tree(&self, id: HostNodeId, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        let Ok(node) = self.node(id) else {
            out.push_str(&format!("{pad}<missing {id}>\n"));
            return;
        };
        match &node.kind {
            NodeKind::Text(t) => out.push_str(&format!("{pad}{id} \"{t}\"\n")),
            NodeKind::Element { tag, attrs, .. } => {
                let mut entries: Vec<_> = attrs
                    .iter()
                    .map(|(k, v)| format!("{k}={}", v.to_attr_string()))
                    .collect();
                entries.sort();
                if entries.is_empty() {
                    out.push_str(&format!("{pad}{id} <{tag}>\n"));
                } else {
                    out.push_str(&format!("{pad}{id} <{tag} {}>\n", entries.join(" ")));
                }
                for child in &node.children {
                    self.render_tree(*child, depth + 1, out);
                }
            }
        }
    }

    /// Human-readable dump of the subtree under `root`, for debugging and
    /// structural assertions in tests.
    pub fn dump_tree(&self, root: HostNodeId) -> String {
        let mut out = String::new();
        self.render_tree(root, 0, &mut out);
        out
    }
}

impl HostBackend for MemoryHost {
    fn create_element(&mut self, tag: &str, is_svg: bool) -> HostNodeId {
        let id = self.alloc(MemoryNode {
            kind: NodeKind::Element {
                tag: tag.to_string(),
                is_svg,
                attrs: AttrMap::default(),
            },
            parent: None,
            children: SmallVec::new(),
        });
        self.mutations.push(Mutation::CreateElement {
            id,
            tag: tag.to_string(),
        });
        id
    }

    fn create_text(&mut self, text: &str) -> HostNodeId {
        let id = self.alloc(MemoryNode {
            kind: NodeKind::Text(text.to_string()),
            parent: None,
            children: SmallVec::new(),
        });
        self.mutations.push(Mutation::CreateText {
            id,
            text: text.to_string(),
        });
        id
    }

    fn tag(&self, id: HostNodeId) -> Result<Option<String>, HostError> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag, .. } => Ok(Some(tag.clone())),
            NodeKind::Text(_) => Ok(None),
        }
    }

    fn text(&self, id: HostNodeId) -> Result<String, HostError> {
        match &self.node(id)?.kind {
            NodeKind::Text(t) => Ok(t.clone()),
            NodeKind::Element { .. } => Err(HostError::TypeMismatch {
                id,
                expected: "text",
            }),
        }
    }

    fn set_text(&mut self, id: HostNodeId, text: &str) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(t) => {
                *t = text.to_string();
                self.mutations.push(Mutation::SetText {
                    id,
                    text: text.to_string(),
                });
                Ok(())
            }
            NodeKind::Element { .. } => Err(HostError::TypeMismatch {
                id,
                expected: "text",
            }),
        }
    }

    fn is_svg(&self, id: HostNodeId) -> Result<bool, HostError> {
        match &self.node(id)?.kind {
            NodeKind::Element { is_svg, .. } => Ok(*is_svg),
            NodeKind::Text(_) => Ok(false),
        }
    }

    fn parent(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError> {
        Ok(self.node(id)?.parent)
    }

    fn child_count(&self, id: HostNodeId) -> Result<usize, HostError> {
        Ok(self.node(id)?.children.len())
    }

    fn child_at(&self, id: HostNodeId, index: usize) -> Result<Option<HostNodeId>, HostError> {
        Ok(self.node(id)?.children.get(index).copied())
    }

    fn first_child(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError> {
        Ok(self.node(id)?.children.first().copied())
    }

    fn last_child(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError> {
        Ok(self.node(id)?.children.last().copied())
    }

    fn next_sibling(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        let siblings = &self.node(parent)?.children;
        let pos = siblings.iter().position(|c| *c == id);
        Ok(pos.and_then(|p| siblings.get(p + 1)).copied())
    }

    fn prev_sibling(&self, id: HostNodeId) -> Result<Option<HostNodeId>, HostError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        let siblings = &self.node(parent)?.children;
        let pos = siblings.iter().position(|c| *c == id);
        Ok(match pos {
            Some(p) if p > 0 => siblings.get(p - 1).copied(),
            _ => None,
        })
    }

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        self.node(parent)?;
        self.unlink(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::Append { parent, child });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: HostNodeId,
        child: HostNodeId,
        before: HostNodeId,
    ) -> Result<(), HostError> {
        self.node(parent)?;
        self.unlink(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        match siblings.iter().position(|c| *c == before) {
            Some(pos) => siblings.insert(pos, child),
            None => siblings.push(child),
        }
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::InsertBefore {
            parent,
            child,
            before,
        });
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: HostNodeId,
        new: HostNodeId,
        old: HostNodeId,
    ) -> Result<(), HostError> {
        self.node(parent)?;
        self.unlink(new)?;
        let siblings = &mut self.node_mut(parent)?.children;
        match siblings.iter().position(|c| *c == old) {
            Some(pos) => siblings[pos] = new,
            None => siblings.push(new),
        }
        self.node_mut(old)?.parent = None;
        self.node_mut(new)?.parent = Some(parent);
        self.mutations.push(Mutation::Replace { parent, new, old });
        Ok(())
    }

    fn detach(&mut self, id: HostNodeId) -> Result<(), HostError> {
        let had_parent = self.node(id)?.parent.is_some();
        self.unlink(id)?;
        if had_parent {
            self.mutations.push(Mutation::Detach { id });
        }
        Ok(())
    }

    fn set_attribute(
        &mut self,
        id: HostNodeId,
        name: &str,
        _old: Option<&Value>,
        new: Option<&Value>,
        _is_svg: bool,
    ) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { attrs, .. } => {
                match new {
                    Some(value) => {
                        attrs.insert(name.to_string(), value.clone());
                    }
                    None => {
                        attrs.remove(name);
                    }
                }
                self.mutations.push(Mutation::SetAttribute {
                    id,
                    name: name.to_string(),
                    value: new.cloned(),
                });
                Ok(())
            }
            NodeKind::Text(_) => Err(HostError::TypeMismatch {
                id,
                expected: "element",
            }),
        }
    }

    fn attribute(&self, id: HostNodeId, name: &str) -> Result<Option<Value>, HostError> {
        match &self.node(id)?.kind {
            NodeKind::Element { attrs, .. } => Ok(attrs.get(name).cloned()),
            NodeKind::Text(_) => Ok(None),
        }
    }

    fn attributes(&self, id: HostNodeId) -> Result<AttrMap, HostError> {
        match &self.node(id)?.kind {
            NodeKind::Element { attrs, .. } => Ok(attrs.clone()),
            NodeKind::Text(_) => Ok(AttrMap::default()),
        }
    }
}

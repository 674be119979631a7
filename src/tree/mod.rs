//! Render tree construction
//!
//! Nodes are appended to whichever node is currently open (the innermost
//! scope). Construction is single-pass and append-only; nothing here diffs
//! against an earlier tree, the frontend reconciles.
//!
//! Nodes live in an arena while the pass runs and are addressed by
//! [`NodeId`], so a region mounted earlier can be re-entered or emptied
//! later in the same pass. [`RenderTree::finish`] turns the arena into the
//! nested [`Node`] wire shape.
//!
//! Scopes are opened through [`ScopeHost::enter`], which returns a [`Scope`]
//! guard. Dropping the guard restores the enclosing scope on every exit
//! path: normal block end, early `?` return, or a panic unwinding through it.

pub mod stack;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

use crate::error::GuiError;
pub use stack::{ScopeEntry, ScopeStack};

/// Node properties, interpreted by the frontend by convention
pub type Props = Map<String, Value>;

/// A UI node description as sent to the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn with_props(name: impl Into<String>, props: Props) -> Self {
        Self {
            name: name.into(),
            props,
            children: Vec::new(),
        }
    }

    /// Builder-style property setter
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Builder-style child append
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

/// Handle to a node mounted in a [`RenderTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    props: Props,
    children: Vec<NodeId>,
}

/// Append-only tree under construction
#[derive(Debug, Clone)]
pub struct RenderTree {
    slots: Vec<Slot>,
    scopes: ScopeStack,
}

impl RenderTree {
    /// Create a tree whose root scope is already open
    pub fn new(root_name: impl Into<String>) -> Self {
        let name = root_name.into();
        let mut scopes = ScopeStack::new();
        scopes.push(NodeId(0), name.clone());
        Self {
            slots: vec![Slot {
                name,
                props: Props::new(),
                children: Vec::new(),
            }],
            scopes,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Node currently receiving children
    pub fn current(&self) -> NodeId {
        self.scopes.current().unwrap_or(NodeId(0))
    }

    /// Number of open scopes, the root included
    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Number of nodes ever mounted, the root included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() <= 1 && self.slots[0].children.is_empty()
    }

    /// Append a node to the current scope
    pub fn mount(&mut self, name: impl Into<String>, props: Props) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            name: name.into(),
            props,
            children: Vec::new(),
        });
        let parent = self.current();
        self.slots[parent.0].children.push(id);
        id
    }

    /// Append a prebuilt node, children included, to the current scope
    pub fn mount_node(&mut self, node: Node) -> NodeId {
        let Node { name, props, children } = node;
        let id = self.mount(name, props);
        self.scopes.push(id, String::new());
        for child in children {
            self.mount_node(child);
        }
        self.scopes.pop();
        id
    }

    /// Open `id` as the innermost scope without a guard
    ///
    /// Prefer [`ScopeHost::enter`], which closes the scope on every exit path.
    pub fn push_scope(&mut self, id: NodeId) -> Result<(), GuiError> {
        let name = self.slot(id)?.name.clone();
        self.scopes.push(id, name);
        Ok(())
    }

    /// Close the innermost scope; the root scope cannot be closed
    pub fn pop_scope(&mut self) -> Result<NodeId, GuiError> {
        if self.scopes.depth() <= 1 {
            return Err(GuiError::ScopeUnderflow);
        }
        self.scopes
            .pop()
            .map(|entry| entry.node)
            .ok_or(GuiError::ScopeUnderflow)
    }

    pub(crate) fn restore_depth(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// Drop every child of `id` so the region can be rebuilt
    pub fn empty(&mut self, id: NodeId) -> Result<(), GuiError> {
        self.slot_mut(id)?.children.clear();
        Ok(())
    }

    pub fn name(&self, id: NodeId) -> Result<&str, GuiError> {
        Ok(self.slot(id)?.name.as_str())
    }

    pub fn props(&self, id: NodeId) -> Result<&Props, GuiError> {
        Ok(&self.slot(id)?.props)
    }

    pub fn props_mut(&mut self, id: NodeId) -> Result<&mut Props, GuiError> {
        Ok(&mut self.slot_mut(id)?.props)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], GuiError> {
        Ok(&self.slot(id)?.children)
    }

    /// Materialise the subtree under `id`
    pub fn build(&self, id: NodeId) -> Result<Node, GuiError> {
        let slot = self.slot(id)?;
        let children = slot
            .children
            .iter()
            .map(|child| self.build(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node {
            name: slot.name.clone(),
            props: slot.props.clone(),
            children,
        })
    }

    /// Consume the tree, returning the root node
    ///
    /// Fails if any scope other than the root is still open.
    pub fn finish(self) -> Result<Node, GuiError> {
        if self.scopes.depth() > 1 {
            return Err(GuiError::UnclosedScope {
                path: self.scopes.path(),
            });
        }
        self.build(self.root())
    }

    fn slot(&self, id: NodeId) -> Result<&Slot, GuiError> {
        self.slots.get(id.0).ok_or(GuiError::UnknownNode(id.0))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot, GuiError> {
        self.slots.get_mut(id.0).ok_or(GuiError::UnknownNode(id.0))
    }
}

/// Anything that owns a [`RenderTree`] and can open scopes in it
pub trait ScopeHost {
    fn tree_mut(&mut self) -> &mut RenderTree;

    /// Open `node` as the innermost scope until the guard drops
    fn enter(&mut self, node: NodeId) -> Result<Scope<'_, Self>, GuiError>
    where
        Self: Sized,
    {
        Scope::open(self, node)
    }

    /// Run `f` with `node` open as the innermost scope
    fn nest<R>(&mut self, node: NodeId, f: impl FnOnce(&mut Self) -> R) -> Result<R, GuiError>
    where
        Self: Sized,
    {
        let mut scope = Scope::open(self, node)?;
        Ok(f(&mut *scope))
    }
}

impl ScopeHost for RenderTree {
    fn tree_mut(&mut self) -> &mut RenderTree {
        self
    }
}

/// Guard keeping a node open as the innermost scope
///
/// Dereferences to the host, so construction continues through the guard.
/// On drop, every scope opened since the guard was created is closed.
pub struct Scope<'a, H: ScopeHost> {
    host: &'a mut H,
    depth: usize,
    node: NodeId,
}

impl<'a, H: ScopeHost> Scope<'a, H> {
    fn open(host: &'a mut H, node: NodeId) -> Result<Self, GuiError> {
        let tree = host.tree_mut();
        let depth = tree.depth();
        tree.push_scope(node)?;
        Ok(Self { host, depth, node })
    }

    /// Node this guard keeps open
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl<H: ScopeHost> Deref for Scope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: ScopeHost> DerefMut for Scope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: ScopeHost> Drop for Scope<'_, H> {
    fn drop(&mut self) {
        self.host.tree_mut().restore_depth(self.depth);
    }
}

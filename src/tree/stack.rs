//! Open-scope tracking for the render tree
//!
//! The stack records which nodes are currently open to receive children,
//! innermost last. Its bottom entry is always the pass root.

use super::NodeId;

/// A single open scope
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeEntry {
    /// Node receiving children while this scope is open
    pub node: NodeId,
    /// Node name, kept for error reporting
    pub name: String,
}

/// Stack of open scopes
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    entries: Vec<ScopeEntry>,
}

impl ScopeStack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Open a scope on top of the stack
    pub fn push(&mut self, node: NodeId, name: impl Into<String>) {
        self.entries.push(ScopeEntry {
            node,
            name: name.into(),
        });
    }

    /// Close the innermost scope
    pub fn pop(&mut self) -> Option<ScopeEntry> {
        self.entries.pop()
    }

    /// Close every scope above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }

    /// Node that currently receives children
    pub fn current(&self) -> Option<NodeId> {
        self.entries.last().map(|e| e.node)
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }

    /// Open scopes rendered as `root > div > ...`
    pub fn path(&self) -> String {
        self.entries
            .iter()
            .map(|e| if e.name.is_empty() { "<anonymous>" } else { e.name.as_str() })
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

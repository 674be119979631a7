//! Per-pass render context
//!
//! A [`RenderSession`] is handed by reference to the render function. It owns
//! the tree under construction, the Session State, the query parameters,
//! accumulated style fragments, and the set of channels polled during the
//! pass. Nothing here is global: concurrent requests each get their own
//! session, and the orchestrator builds a fresh one for every restart,
//! carrying over only the Session State and query parameters.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::GuiConfig;
use crate::error::GuiError;
use crate::key;
use crate::pubsub::PubSub;
use crate::render::protocol::RESERVED_FIELDS;
use crate::state::SessionState;
use crate::tree::{Node, NodeId, Props, RenderTree, ScopeHost};

/// Name of the implicit root node
pub const ROOT_NODE: &str = "root";

/// Per-call defaults for the async helpers
#[derive(Debug, Clone)]
pub(crate) struct HelperDefaults {
    pub state_ttl: Option<Duration>,
    pub task_ttl: Option<Duration>,
    pub placeholder: String,
}

impl From<&GuiConfig> for HelperDefaults {
    fn from(config: &GuiConfig) -> Self {
        Self {
            state_ttl: config.state_ttl,
            task_ttl: config.stall_policy.ttl(),
            placeholder: config.placeholder.clone(),
        }
    }
}

/// Live state of one render pass
#[derive(Debug)]
pub struct RenderSession {
    pub(crate) tree: RenderTree,
    pub(crate) state: SessionState,
    pub(crate) query_params: IndexMap<String, String>,
    pub(crate) bridge: PubSub,
    pub(crate) styles: IndexMap<String, String>,
    pub(crate) channels: IndexSet<String>,
    pub(crate) extra: Map<String, Value>,
    pub(crate) use_state_count: usize,
    pub(crate) defaults: HelperDefaults,
}

/// What is left of a session once its pass has ended
#[derive(Debug)]
pub struct SessionParts {
    pub tree: RenderTree,
    pub state: SessionState,
    pub query_params: IndexMap<String, String>,
    pub styles: IndexMap<String, String>,
    pub channels: IndexSet<String>,
    pub extra: Map<String, Value>,
}

impl RenderSession {
    /// Session with default helper settings
    pub fn new(state: SessionState, bridge: PubSub) -> Self {
        Self::with_config(state, IndexMap::new(), bridge, &GuiConfig::default())
    }

    pub fn with_config(
        state: SessionState,
        query_params: IndexMap<String, String>,
        bridge: PubSub,
        config: &GuiConfig,
    ) -> Self {
        Self {
            tree: RenderTree::new(ROOT_NODE),
            state,
            query_params,
            bridge,
            styles: IndexMap::new(),
            channels: IndexSet::new(),
            extra: Map::new(),
            use_state_count: 0,
            defaults: HelperDefaults::from(config),
        }
    }

    pub fn into_parts(self) -> SessionParts {
        SessionParts {
            tree: self.tree,
            state: self.state,
            query_params: self.query_params,
            styles: self.styles,
            channels: self.channels,
            extra: self.extra,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn query_params(&self) -> &IndexMap<String, String> {
        &self.query_params
    }

    pub fn set_query_params(&mut self, params: IndexMap<String, String>) {
        self.query_params = params;
    }

    pub fn bridge(&self) -> &PubSub {
        &self.bridge
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    /// Node currently receiving children
    pub fn current(&self) -> NodeId {
        self.tree.current()
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Append a node to the current scope
    pub fn mount(&mut self, name: impl Into<String>, props: Props) -> NodeId {
        self.tree.mount(name, props)
    }

    /// Append a prebuilt node to the current scope
    pub fn mount_node(&mut self, node: Node) -> NodeId {
        self.tree.mount_node(node)
    }

    pub fn props_mut(&mut self, id: NodeId) -> Result<&mut Props, GuiError> {
        self.tree.props_mut(id)
    }

    /// Drop every child of `id` so the region can be rebuilt
    pub fn empty(&mut self, id: NodeId) -> Result<(), GuiError> {
        self.tree.empty(id)
    }

    /// Register a CSS fragment for this pass; later fragments replace earlier
    /// ones for the same class
    pub fn add_styles(&mut self, class_name: impl Into<String>, css: impl Into<String>) {
        self.styles.insert(class_name.into(), css.into());
    }

    pub fn styles(&self) -> &IndexMap<String, String> {
        &self.styles
    }

    /// Mount an anonymous node styled by `css`
    ///
    /// `&` in the CSS stands for the generated class selector.
    pub fn styled(&mut self, css: &str) -> NodeId {
        let css = textwrap::dedent(css);
        let css = css.trim();
        let class_name = format!("gui-{}", key::digest(css));
        let css = css.replace('&', &format!(".{class_name}"));
        self.add_styles(class_name.clone(), css);

        let mut props = Props::new();
        props.insert("className".to_string(), Value::String(class_name));
        self.mount("", props)
    }

    /// Poll channels through the bridge, recording them for the caller
    pub fn poll<S: AsRef<str>>(&mut self, channels: &[S]) -> Result<Vec<Option<Value>>, GuiError> {
        for channel in channels {
            self.channels.insert(self.bridge.wire_name(channel.as_ref()));
        }
        self.bridge.poll(channels)
    }

    /// Add a top-level field to the response of this pass
    ///
    /// Fields set in a pass that is rerun are dropped with it.
    pub fn respond_with<T: Serialize + ?Sized>(&mut self, field: &str, value: &T) -> Result<(), GuiError> {
        if RESERVED_FIELDS.contains(&field) {
            return Err(GuiError::ReservedField(field.to_string()));
        }
        let value = serde_json::to_value(value).map_err(GuiError::NotSerializable)?;
        self.extra.insert(field.to_string(), value);
        Ok(())
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Wire names of every channel polled during this pass
    pub fn channels(&self) -> &IndexSet<String> {
        &self.channels
    }
}

impl ScopeHost for RenderSession {
    fn tree_mut(&mut self) -> &mut RenderTree {
        &mut self.tree
    }
}

// Library interface for the gooey-gui render core
// The render binary, benchmarks and integration tests all go through here

pub mod config;
pub mod error;
pub mod interactions;
pub mod key;
pub mod logging;
pub mod pubsub;
pub mod render;
pub mod rerun;
pub mod session;
pub mod state;
pub mod tree;

// used by the exported `fingerprint!` macro
pub use serde_json;

pub use config::{GuiConfig, StallPolicy};
pub use error::GuiError;
pub use interactions::{cache_in_session_state, Memoized, RunOptions, StateSetter};
pub use pubsub::{ChannelStore, Listener, MemoryStore, PubSub, Subscription};
pub use render::{RenderOutcome, RenderRequest, RenderResponse, Renderer};
pub use rerun::{redirect, rerun, stop, Interrupt, PassResult, Redirect};
pub use session::RenderSession;
pub use state::SessionState;
pub use tree::{Node, NodeId, Props, RenderTree, Scope, ScopeHost};

//! Structured error types for the render core
//!
//! Every failure the engine can produce maps to a stable error code, so the
//! external transport can render it either as text or as structured JSON.
//! Control flow (rerun, stop, redirect) is not an error and never shows up
//! here; see [`crate::rerun::Interrupt`].

use thiserror::Error;

/// Errors produced by the render core
#[derive(Debug, Error)]
pub enum GuiError {
    /// The inbound request payload could not be decoded
    #[error("malformed render request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    /// A value could not be converted to JSON
    #[error("value is not JSON-serializable: {0}")]
    NotSerializable(#[source] serde_json::Error),

    /// A Session State entry does not have the shape the caller expected
    #[error("session state key '{key}': {message}")]
    InvalidState { key: String, message: String },

    /// The external pub/sub store could not be reached
    #[error("pub/sub store unavailable: {0}")]
    StoreUnavailable(String),

    /// An exit was requested while only the root scope was open
    #[error("cannot exit the root scope")]
    ScopeUnderflow,

    /// The tree was finalised while scopes were still open
    #[error("tree finalised with open scopes: {path}")]
    UnclosedScope { path: String },

    /// A node handle does not belong to this tree
    #[error("unknown node handle #{0}")]
    UnknownNode(usize),

    /// A background task could not be started
    #[error("failed to spawn background task: {0}")]
    Spawn(#[source] std::io::Error),

    /// A page tried to set a response field the engine owns
    #[error("'{0}' is a reserved response field")]
    ReservedField(String),

    /// A configuration value could not be parsed
    #[error("invalid config value for {key}: '{value}'")]
    Config { key: String, value: String },

    /// The render function failed with an error of its own
    #[error("render function failed: {0:#}")]
    Render(anyhow::Error),
}

impl GuiError {
    /// Shorthand for [`GuiError::InvalidState`]
    pub fn invalid_state(key: impl Into<String>, message: impl Into<String>) -> Self {
        GuiError::InvalidState {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Stable error code category
    pub fn code(&self) -> &'static str {
        match self {
            GuiError::MalformedRequest(_) => "MALFORMED_REQUEST",
            GuiError::NotSerializable(_) => "NOT_SERIALIZABLE",
            GuiError::InvalidState { .. } => "INVALID_STATE",
            GuiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            GuiError::ScopeUnderflow => "SCOPE_UNDERFLOW",
            GuiError::UnclosedScope { .. } => "UNCLOSED_SCOPE",
            GuiError::UnknownNode(_) => "UNKNOWN_NODE",
            GuiError::Spawn(_) => "SPAWN_FAILED",
            GuiError::ReservedField(_) => "RESERVED_FIELD",
            GuiError::Config { .. } => "INVALID_CONFIG",
            GuiError::Render(_) => "RENDER_FAILED",
        }
    }

    /// HTTP-style status hint for the transport layer
    ///
    /// Caller-input errors are 400, everything else is 500.
    pub fn status(&self) -> u16 {
        match self {
            GuiError::MalformedRequest(_) | GuiError::NotSerializable(_) => 400,
            _ => 500,
        }
    }

    /// Whether the caller sent something the engine could not accept
    pub fn is_caller_error(&self) -> bool {
        self.status() == 400
    }

    /// Format error as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error_code": self.code(),
            "message": self.to_string(),
            "status": self.status(),
        })
    }
}

//! Render invocation wire types
//!
//! The transport decodes an inbound request into a [`RenderRequest`] and
//! encodes the [`RenderOutcome`] back. Both are JSON; the newline-delimited
//! helpers at the bottom frame one message per line for stream transports.
//!
//! ```text
//! request:  {"state": {...}, "query_params": {"k": "v"}}
//! page:     {"children": [Node...], "state": {...}, "channels": ["..."], ...extra}
//! redirect: {"url": "/login", "status": 302}
//! ```

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GuiError;
use crate::rerun::Redirect;
use crate::tree::Node;

/// Response header marking a render response, for the transport
pub const ROUTE_HEADER: (&str, &str) = ("X-GOOEY-GUI-ROUTE", "1");

/// One render invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Session State from the previous response; absent on first load
    #[serde(default)]
    pub state: Option<Map<String, Value>>,
    #[serde(default)]
    pub query_params: IndexMap<String, String>,
}

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a request body
    pub fn from_json(body: &[u8]) -> Result<Self, GuiError> {
        serde_json::from_slice(body).map_err(GuiError::MalformedRequest)
    }

    pub fn with_state(mut self, state: Map<String, Value>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }
}

/// A completed render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResponse {
    /// Children of the root node
    pub children: Vec<Node>,
    /// Session State to send back with the next request
    pub state: Map<String, Value>,
    /// Store-level channels whose updates should trigger a re-render
    pub channels: Vec<String>,
    /// Page-supplied top-level fields, see [`RenderSession::respond_with`]
    ///
    /// [`RenderSession::respond_with`]: crate::session::RenderSession::respond_with
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response fields a page cannot override
pub const RESERVED_FIELDS: &[&str] = &["children", "state", "channels"];

/// Result of one render invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderOutcome {
    Page(RenderResponse),
    Redirect(Redirect),
}

impl RenderOutcome {
    pub fn as_page(&self) -> Option<&RenderResponse> {
        match self {
            RenderOutcome::Page(page) => Some(page),
            RenderOutcome::Redirect(_) => None,
        }
    }

    pub fn as_redirect(&self) -> Option<&Redirect> {
        match self {
            RenderOutcome::Redirect(redirect) => Some(redirect),
            RenderOutcome::Page(_) => None,
        }
    }

    pub fn into_page(self) -> Option<RenderResponse> {
        match self {
            RenderOutcome::Page(page) => Some(page),
            RenderOutcome::Redirect(_) => None,
        }
    }

    pub fn to_json(&self) -> Result<Value, GuiError> {
        serde_json::to_value(self).map_err(GuiError::NotSerializable)
    }
}

/// Encode a message as one JSON line (newline included)
pub fn encode_jsonl<T: Serialize>(message: &T) -> Result<String, GuiError> {
    let json = serde_json::to_string(message).map_err(GuiError::NotSerializable)?;
    Ok(format!("{}\n", json))
}

/// Decode a message from one JSON line
pub fn decode_jsonl<T: DeserializeOwned>(line: &str) -> Result<T, GuiError> {
    serde_json::from_str(line.trim()).map_err(GuiError::MalformedRequest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request = RenderRequest::from_json(b"{}").unwrap();
        assert_eq!(request, RenderRequest::new());
        assert!(request.state.is_none());
    }

    #[test]
    fn test_request_with_state_and_params() {
        let body = br#"{"state": {"count": 2}, "query_params": {"tab": "run"}}"#;
        let request = RenderRequest::from_json(body).unwrap();
        assert_eq!(request.state.unwrap()["count"], json!(2));
        assert_eq!(request.query_params["tab"], "run");
    }

    #[test]
    fn test_null_state_is_accepted() {
        let request = RenderRequest::from_json(br#"{"state": null}"#).unwrap();
        assert!(request.state.is_none());
    }

    #[test]
    fn test_malformed_request() {
        let err = RenderRequest::from_json(b"{\"state\": [1, 2]}").unwrap_err();
        assert_eq!(err.code(), "MALFORMED_REQUEST");
        assert_eq!(err.status(), 400);

        assert!(RenderRequest::from_json(b"not json").is_err());
    }

    #[test]
    fn test_page_wire_shape() {
        let mut state = Map::new();
        state.insert("k".into(), json!("v"));
        let outcome = RenderOutcome::Page(RenderResponse {
            children: vec![Node::new("pre").prop("body", "hi")],
            state,
            channels: vec!["gooey-gui/state/x".into()],
            extra: Map::new(),
        });
        assert_eq!(
            outcome.to_json().unwrap(),
            json!({
                "children": [{"name": "pre", "props": {"body": "hi"}, "children": []}],
                "state": {"k": "v"},
                "channels": ["gooey-gui/state/x"]
            })
        );
    }

    #[test]
    fn test_extra_fields_are_flattened() {
        let mut extra = Map::new();
        extra.insert("title".into(), json!("Home"));
        let outcome = RenderOutcome::Page(RenderResponse {
            children: vec![],
            state: Map::new(),
            channels: vec![],
            extra,
        });
        let wire = outcome.to_json().unwrap();
        assert_eq!(
            wire,
            json!({"children": [], "state": {}, "channels": [], "title": "Home"})
        );

        let decoded: RenderOutcome = serde_json::from_value(wire).unwrap();
        assert_eq!(decoded, outcome);
    }

    #[test]
    fn test_redirect_wire_shape() {
        let outcome = RenderOutcome::Redirect(Redirect::new("/login"));
        assert_eq!(outcome.to_json().unwrap(), json!({"url": "/login", "status": 302}));
        assert!(outcome.as_page().is_none());
        assert_eq!(outcome.as_redirect().unwrap().status, 302);
    }

    #[test]
    fn test_jsonl_framing() {
        let request = RenderRequest::new().with_query_param("q", "1");
        let line = encode_jsonl(&request).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let decoded: RenderRequest = decode_jsonl(&line).unwrap();
        assert_eq!(decoded, request);
    }
}

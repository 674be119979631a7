//! Render invocation loop
//!
//! [`Renderer::render`] runs a page function to completion for one request:
//! every pass gets a fresh [`RenderSession`] (new root, empty channel set,
//! use_state ordinals back at zero) seeded with the Session State and query
//! parameters left by the previous pass. Restarts repeat the loop; stop,
//! redirect and normal return end it.

pub mod protocol;

use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::GuiConfig;
use crate::error::GuiError;
use crate::logging::render_span;
use crate::pubsub::{ChannelStore, MemoryStore, PubSub};
use crate::rerun::{Decision, PassExit, PassResult, RerunController};
use crate::session::{RenderSession, SessionParts};
use crate::state::SessionState;
use crate::tree::Node;

pub use protocol::{RenderOutcome, RenderRequest, RenderResponse, ROUTE_HEADER};

/// Node carrying the pass's CSS fragments
pub const STYLE_NODE: &str = "tag";

/// Runs page functions against a shared store
#[derive(Debug, Clone)]
pub struct Renderer {
    config: GuiConfig,
    bridge: PubSub,
}

impl Renderer {
    pub fn new(config: GuiConfig, store: Arc<dyn ChannelStore>) -> Self {
        let bridge = PubSub::from_config(store, &config);
        Self { config, bridge }
    }

    /// Renderer backed by a fresh in-process store
    pub fn with_memory_store(config: GuiConfig) -> Self {
        Self::new(config, MemoryStore::shared())
    }

    pub fn bridge(&self) -> &PubSub {
        &self.bridge
    }

    pub fn config(&self) -> &GuiConfig {
        &self.config
    }

    /// Run `page` until it completes, stops, or redirects
    pub fn render<F>(&self, request: RenderRequest, mut page: F) -> Result<RenderOutcome, GuiError>
    where
        F: FnMut(&mut RenderSession) -> PassResult,
    {
        let RenderRequest { state, query_params } = request;
        let mut state = SessionState::from(state.unwrap_or_default());
        let mut query_params = query_params;

        let span = render_span(state.len(), query_params.len());
        let _entered = span.enter();

        let mut controller = RerunController::new();
        loop {
            controller.begin_pass();
            let mut session =
                RenderSession::with_config(state, query_params, self.bridge.clone(), &self.config);
            let result = page(&mut session);
            let decision = controller.settle(result);
            let parts = session.into_parts();

            match decision {
                Decision::Rerun => {
                    tracing::debug!(pass = controller.passes(), "rerun requested");
                    state = parts.state;
                    query_params = parts.query_params;
                }
                Decision::Finish(PassExit::Redirected(redirect)) => {
                    span.record("passes", controller.passes());
                    tracing::debug!(url = %redirect.url, status = redirect.status, "redirect");
                    return Ok(RenderOutcome::Redirect(redirect));
                }
                Decision::Finish(exit) => {
                    span.record("passes", controller.passes());
                    if exit == PassExit::Stopped {
                        tracing::debug!(pass = controller.passes(), "stop requested");
                    }
                    return self.finish(parts).map(RenderOutcome::Page);
                }
                Decision::Fail(err) => {
                    span.record("passes", controller.passes());
                    tracing::warn!(error = %format!("{err:#}"), "render failed");
                    // engine errors keep their own code and status
                    return Err(match err.downcast::<GuiError>() {
                        Ok(err) => err,
                        Err(err) => GuiError::Render(err),
                    });
                }
            }
        }
    }

    fn finish(&self, parts: SessionParts) -> Result<RenderResponse, GuiError> {
        let SessionParts {
            tree,
            state,
            styles,
            mut channels,
            extra,
            ..
        } = parts;

        let mut root = tree.finish()?;
        if !styles.is_empty() {
            let css: Vec<&str> = styles.values().map(String::as_str).collect();
            root.children.insert(0, style_node(&css.join("\n")));
        }

        for extra in &self.config.extra_channels {
            channels.insert(self.bridge.wire_name(extra));
        }

        Ok(RenderResponse {
            children: root.children,
            state: state.into_inner(),
            channels: channels.into_iter().collect(),
            extra,
        })
    }
}

fn style_node(css: &str) -> Node {
    Node::new(STYLE_NODE)
        .prop("__reactjsxelement", "style")
        .prop("dangerouslySetInnerHTML", json!({ "__html": Value::String(css.to_string()) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerun::{redirect, rerun, stop};
    use crate::tree::{Props, ScopeHost};

    fn renderer() -> Renderer {
        Renderer::with_memory_store(GuiConfig::default())
    }

    #[test]
    fn test_first_load_starts_empty() {
        let outcome = renderer()
            .render(RenderRequest::new(), |s| {
                assert!(s.state().is_empty());
                s.mount("pre", Props::new());
                Ok(())
            })
            .unwrap();
        let page = outcome.into_page().unwrap();
        assert_eq!(page.children.len(), 1);
        assert!(page.state.is_empty());
        assert!(page.channels.is_empty());
    }

    #[test]
    fn test_rerun_keeps_state_and_drops_tree() {
        let mut runs = 0;
        let outcome = renderer()
            .render(RenderRequest::new(), |s| {
                runs += 1;
                let first = !s.state().contains_key("flag");
                s.mount(if first { "first" } else { "second" }, Props::new());
                if first {
                    s.state_mut().set("flag", true);
                    return rerun();
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(runs, 2);
        let page = outcome.into_page().unwrap();
        let names: Vec<_> = page.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["second"]);
        assert_eq!(page.state["flag"], json!(true));
    }

    #[test]
    fn test_stop_inside_scope_keeps_partial_tree() {
        let outcome = renderer()
            .render(RenderRequest::new(), |s| {
                let div = s.mount("div", Props::new());
                let mut inner = s.enter(div)?;
                inner.mount("pre", Props::new());
                stop()
            })
            .unwrap();
        let page = outcome.into_page().unwrap();
        assert_eq!(page.children[0].children[0].name, "pre");
    }

    #[test]
    fn test_redirect_short_circuits() {
        let outcome = renderer()
            .render(RenderRequest::new(), |s| {
                s.mount("never-sent", Props::new());
                redirect("/login")
            })
            .unwrap();
        assert_eq!(outcome.as_redirect().unwrap().url, "/login");
    }

    #[test]
    fn test_style_node_first() {
        let outcome = renderer()
            .render(RenderRequest::new(), |s| {
                s.mount("h1", Props::new());
                s.add_styles("a", ".a { color: red }");
                s.add_styles("b", ".b { color: blue }");
                Ok(())
            })
            .unwrap();
        let page = outcome.into_page().unwrap();
        assert_eq!(page.children[0].name, STYLE_NODE);
        assert_eq!(
            page.children[0].props["dangerouslySetInnerHTML"]["__html"],
            json!(".a { color: red }\n.b { color: blue }")
        );
        assert_eq!(page.children[1].name, "h1");
    }

    #[test]
    fn test_extra_channels_reported() {
        let mut config = GuiConfig::default();
        config.extra_channels = vec!["--hot-reload".to_string()];
        let outcome = Renderer::with_memory_store(config)
            .render(RenderRequest::new(), |s| {
                s.poll(&["a"])?;
                Ok(())
            })
            .unwrap();
        assert_eq!(
            outcome.into_page().unwrap().channels,
            vec!["gooey-gui/state/a", "gooey-gui/state/--hot-reload"]
        );
    }

    #[test]
    fn test_engine_errors_keep_their_code() {
        let err = renderer()
            .render(RenderRequest::new(), |s| {
                s.state_mut().set("count", "three");
                s.state().get_as::<u32>("count")?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn test_extra_fields_from_final_pass() {
        let outcome = renderer()
            .render(RenderRequest::new(), |s| {
                if !s.state().contains_key("again") {
                    s.respond_with("discarded", &true)?;
                    s.state_mut().set("again", true);
                    return rerun();
                }
                s.respond_with("title", "Dashboard")?;
                Ok(())
            })
            .unwrap();
        let page = outcome.into_page().unwrap();
        assert_eq!(page.extra.len(), 1);
        assert_eq!(page.extra["title"], json!("Dashboard"));
    }

    #[test]
    fn test_failure_is_reported() {
        let err = renderer()
            .render(RenderRequest::new(), |_| Err(anyhow::anyhow!("boom").into()))
            .unwrap_err();
        assert_eq!(err.code(), "RENDER_FAILED");
        assert!(err.to_string().contains("boom"));
    }
}

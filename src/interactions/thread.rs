//! Background-task bridge
//!
//! The first pass that reaches [`RenderSession::run_in_thread`] for a logical
//! key starts the task on its own thread and records `key -> channel` in
//! Session State. Every later pass polls that channel instead of starting the
//! task again, until the result shows up. Then the mapping is either kept
//! (`cache`, the result is read straight from Session State from then on) or
//! removed, so the next call launches the task afresh.
//!
//! There is no cancellation and no failure reporting: a task that panics
//! never publishes, and the placeholder stays up. Tasks that can fail should
//! return a value describing the failure instead.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use super::{decode, short_type_name, take_payload, wrap_payload};
use crate::error::GuiError;
use crate::pubsub::PubSub;
use crate::session::RenderSession;
use crate::tree::Props;

/// Node name used for the placeholder text
pub const PLACEHOLDER_NODE: &str = "markdown";

/// Options for [`RenderSession::run_in_thread`]
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    key: Option<String>,
    placeholder: Option<Option<String>>,
    cache: bool,
    ttl: Option<Option<Duration>>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical key; defaults to one derived from the task's type name and
    /// the call site
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Text mounted while the task is running
    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(Some(text.into()));
        self
    }

    /// Mount nothing while the task is running
    pub fn no_placeholder(mut self) -> Self {
        self.placeholder = Some(None);
        self
    }

    /// Keep the result in Session State and never run the task again
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Expiry of the published result; `None` keeps it until overwritten
    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl RenderSession {
    /// Run `task` off the render thread, returning its result once published
    ///
    /// Returns `Ok(None)` (and mounts the placeholder) while the task is still
    /// running. Only one task per logical key is in flight at a time.
    #[track_caller]
    pub fn run_in_thread<F, T>(&mut self, task: F, options: RunOptions) -> Result<Option<T>, GuiError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Serialize + DeserializeOwned,
    {
        let key = match &options.key {
            Some(key) => key.clone(),
            None => {
                let site = std::panic::Location::caller();
                format!(
                    "run_in_thread/{}@{}:{}:{}",
                    std::any::type_name::<F>(),
                    site.file(),
                    site.line(),
                    site.column()
                )
            }
        };

        let channel = match self.state.get(&key) {
            Some(Value::String(channel)) => channel.clone(),
            Some(_) => return Err(GuiError::invalid_state(key, "expected a channel name")),
            None => {
                let channel = format!("run_in_thread/{}/{}", short_type_name::<F>(), Uuid::new_v4());
                let ttl = options.ttl.unwrap_or(self.defaults.task_ttl);
                spawn_task(self.bridge.clone(), channel.clone(), ttl, task)?;
                self.state.set(key.clone(), channel.clone());
                channel
            }
        };

        if let Some(cached) = self.state.get(&channel) {
            return decode(&channel, cached.clone()).map(Some);
        }

        let published = self.poll(&[channel.as_str()])?.pop().flatten();
        if let Some(value) = published.and_then(take_payload) {
            if options.cache {
                self.state.set(channel.clone(), value.clone());
            } else {
                self.state.pop(&key);
            }
            return decode(&channel, value).map(Some);
        }

        let placeholder = match options.placeholder {
            Some(text) => text,
            None => Some(self.defaults.placeholder.clone()),
        };
        if let Some(text) = placeholder {
            let mut props = Props::new();
            props.insert("body".to_string(), Value::String(text));
            self.mount(PLACEHOLDER_NODE, props);
        }
        Ok(None)
    }
}

/// Start `task` on a detached thread that publishes its result on `channel`
fn spawn_task<F, T>(bridge: PubSub, channel: String, ttl: Option<Duration>, task: F) -> Result<(), GuiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Serialize,
{
    tracing::debug!(channel = %channel, "launching background task");
    std::thread::Builder::new()
        .name(format!("gooey-task-{}", short_type_name::<F>()))
        .spawn(move || {
            let value = task();
            let published = wrap_payload(&value).and_then(|payload| bridge.publish(&channel, &payload, ttl));
            if let Err(e) = published {
                tracing::warn!(channel = %channel, error = %e, "background task result was not published");
            }
        })
        .map(|_| ())
        .map_err(GuiError::Spawn)
}

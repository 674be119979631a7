//! Publish/poll/subscribe bridge over the shared last-value store
//!
//! Logical channel names are prefixed with a fixed namespace token before
//! they reach the store, so they cannot collide with unrelated keys. Every
//! publish writes the JSON-encoded value under the namespaced key and then
//! notifies the topic of the same name with a timestamp.
//!
//! The render pass only ever polls: a point read per channel that never
//! blocks. Blocking subscriptions are for long-lived consumers outside the
//! pass (the transport layer, typically) that re-invoke rendering when a
//! channel changes.

pub mod memory;
pub mod store;

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GuiConfig;
use crate::error::GuiError;
pub use memory::MemoryStore;
pub use store::{ChannelStore, Listener};

/// Default namespace token prepended to every channel name
pub const DEFAULT_CHANNEL_PREFIX: &str = "gooey-gui/state/";

/// Default per-attempt wait in [`Subscription`]
pub const DEFAULT_SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to the shared store, cheap to clone and safe to send to threads
#[derive(Clone)]
pub struct PubSub {
    store: Arc<dyn ChannelStore>,
    prefix: String,
    subscribe_timeout: Duration,
}

impl fmt::Debug for PubSub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("prefix", &self.prefix)
            .field("subscribe_timeout", &self.subscribe_timeout)
            .finish_non_exhaustive()
    }
}

impl PubSub {
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self {
            store,
            prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            subscribe_timeout: DEFAULT_SUBSCRIBE_TIMEOUT,
        }
    }

    pub fn from_config(store: Arc<dyn ChannelStore>, config: &GuiConfig) -> Self {
        Self {
            store,
            prefix: config.channel_prefix.clone(),
            subscribe_timeout: config.subscribe_timeout,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ChannelStore> {
        &self.store
    }

    /// Store-level key for a logical channel name
    pub fn wire_name(&self, channel: &str) -> String {
        format!("{}{}", self.prefix, channel)
    }

    /// Store `value` on `channel` and notify its subscribers
    pub fn publish<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), GuiError> {
        let value = serde_json::to_value(value).map_err(GuiError::NotSerializable)?;
        let wire = self.wire_name(channel);
        self.store.set(&wire, &value.to_string(), ttl)?;
        self.store.publish(&wire, &notification_stamp())?;
        match run_status(&value) {
            Some(status) => tracing::info!(channel = %wire, run_status = %status, "publish"),
            None => tracing::info!(channel = %wire, "publish"),
        }
        Ok(())
    }

    /// Point read of every channel, in order; `None` where absent
    pub fn poll<S: AsRef<str>>(&self, channels: &[S]) -> Result<Vec<Option<Value>>, GuiError> {
        channels
            .iter()
            .map(|channel| self.read_wire(&self.wire_name(channel.as_ref())))
            .collect()
    }

    /// Point read of a single channel
    pub fn poll_one(&self, channel: &str) -> Result<Option<Value>, GuiError> {
        self.read_wire(&self.wire_name(channel))
    }

    /// Endless stream of the values published on `channel`
    pub fn subscribe(&self, channel: &str) -> Result<Subscription, GuiError> {
        let wire = self.wire_name(channel);
        let listener = self.store.listen(&wire)?;
        tracing::info!(channel = %wire, "subscribe");
        Ok(Subscription {
            store: Arc::clone(&self.store),
            listener,
            wire,
            timeout: self.subscribe_timeout,
        })
    }

    fn read_wire(&self, wire: &str) -> Result<Option<Value>, GuiError> {
        match self.store.get(wire)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| GuiError::StoreUnavailable(format!("corrupt value under {wire}: {e}"))),
            None => Ok(None),
        }
    }
}

/// Value of the `__run_status` field, when the payload carries one
fn run_status(value: &Value) -> Option<&Value> {
    value.as_object()?.get("__run_status")
}

/// Notification payload: publish time in fractional seconds
fn notification_stamp() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    Value::from(millis as f64 / 1000.0).to_string()
}

/// Blocking, restartable stream of values published on one channel
///
/// Each attempt waits up to the configured timeout for a notification and
/// silently retries when none arrives, so iteration never ends on its own.
/// Store errors are yielded as items; the caller decides whether to keep
/// going. Dropping the subscription unsubscribes.
pub struct Subscription {
    store: Arc<dyn ChannelStore>,
    listener: Box<dyn Listener>,
    wire: String,
    timeout: Duration,
}

impl Subscription {
    /// Store-level channel this subscription listens on
    pub fn wire_name(&self) -> &str {
        &self.wire
    }

    /// Single attempt: the next value if one is published within `timeout`
    pub fn next_within(&mut self, timeout: Duration) -> Result<Option<Value>, GuiError> {
        if self.listener.next_message(timeout)?.is_none() {
            return Ok(None);
        }
        let Some(raw) = self.store.get(&self.wire)? else {
            // notified, but the value already expired
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| GuiError::StoreUnavailable(format!("corrupt value under {}: {e}", self.wire)))?;
        match run_status(&value) {
            Some(status) => tracing::info!(channel = %self.wire, run_status = %status, "subscription message"),
            None => tracing::info!(channel = %self.wire, "subscription message"),
        }
        Ok(Some(value))
    }
}

impl Iterator for Subscription {
    type Item = Result<Value, GuiError>;

    fn next(&mut self) -> Option<Self::Item> {
        let timeout = self.timeout;
        loop {
            match self.next_within(timeout) {
                Ok(Some(value)) => return Some(Ok(value)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::info!(channel = %self.wire, "unsubscribe");
    }
}

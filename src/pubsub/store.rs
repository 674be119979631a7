//! Seam to the shared, networked last-value store
//!
//! The engine needs three things from the store: a last-value map with
//! optional expiry, a point read, and a notification topic per key. Any
//! backend offering those (Redis `SET EX` + `GET` + `PUBLISH`/`SUBSCRIBE`,
//! for example) can implement [`ChannelStore`]. Implementations must be
//! shareable across threads because background tasks publish through them.

use std::time::Duration;

use crate::error::GuiError;

/// A shared last-value cache with per-key notifications
pub trait ChannelStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), GuiError>;

    /// Point read; `Ok(None)` when absent or expired
    fn get(&self, key: &str) -> Result<Option<String>, GuiError>;

    /// Notify every listener of `topic`
    fn publish(&self, topic: &str, message: &str) -> Result<(), GuiError>;

    /// Start listening on `topic`
    ///
    /// Messages published after this call returns are delivered to the
    /// listener in order.
    fn listen(&self, topic: &str) -> Result<Box<dyn Listener>, GuiError>;
}

/// Receiving end of a topic subscription
pub trait Listener: Send {
    /// Wait up to `timeout` for the next message
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn next_message(&mut self, timeout: Duration) -> Result<Option<String>, GuiError>;
}

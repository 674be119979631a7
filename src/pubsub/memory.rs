//! In-process [`ChannelStore`]
//!
//! Behaves like a single shared Redis instance: a last-value map with
//! expiry plus fan-out topics. Useful for tests, local development, and
//! single-process deployments where every session runs in one address space.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use super::store::{ChannelStore, Listener};
use crate::error::GuiError;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    queue: Mutex<VecDeque<String>>,
    ready: Condvar,
}

/// Shared in-memory last-value store with notifications
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    topics: Mutex<HashMap<String, Vec<Weak<Mailbox>>>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            topics: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Convenience constructor for sharing across sessions and threads
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate the store going offline (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Remaining lifetime of `key`, if it has an expiry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().ok()?;
        let expires_at = entries.get(key)?.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    /// Number of live listeners on `topic`
    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .map(|topics| {
                topics
                    .get(topic)
                    .map(|boxes| boxes.iter().filter(|b| b.strong_count() > 0).count())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), GuiError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GuiError::StoreUnavailable("memory store is offline".to_string()))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, GuiError> {
    mutex
        .lock()
        .map_err(|_| GuiError::StoreUnavailable("memory store lock poisoned".to_string()))
}

impl ChannelStore for MemoryStore {
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), GuiError> {
        self.check_available()?;
        let entry = Entry {
            value: value.to_string(),
            // an expiry past what Instant can represent never fires
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        lock(&self.entries)?.insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, GuiError> {
        self.check_available()?;
        let mut entries = lock(&self.entries)?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn publish(&self, topic: &str, message: &str) -> Result<(), GuiError> {
        self.check_available()?;
        let mut topics = lock(&self.topics)?;
        let Some(boxes) = topics.get_mut(topic) else {
            return Ok(());
        };
        boxes.retain(|b| b.strong_count() > 0);
        if boxes.is_empty() {
            topics.remove(topic);
            return Ok(());
        }
        for mailbox in boxes.iter().filter_map(Weak::upgrade) {
            lock(&mailbox.queue)?.push_back(message.to_string());
            mailbox.ready.notify_all();
        }
        Ok(())
    }

    fn listen(&self, topic: &str) -> Result<Box<dyn Listener>, GuiError> {
        self.check_available()?;
        let mailbox = Arc::new(Mailbox::default());
        let mut topics = lock(&self.topics)?;
        topics.retain(|_, boxes| {
            boxes.retain(|b| b.strong_count() > 0);
            !boxes.is_empty()
        });
        topics
            .entry(topic.to_string())
            .or_default()
            .push(Arc::downgrade(&mailbox));
        Ok(Box::new(MemoryListener { mailbox }))
    }
}

/// Listener handed out by [`MemoryStore::listen`]
///
/// Dropping it unregisters it from the topic.
#[derive(Debug)]
pub struct MemoryListener {
    mailbox: Arc<Mailbox>,
}

impl Listener for MemoryListener {
    fn next_message(&mut self, timeout: Duration) -> Result<Option<String>, GuiError> {
        let queue = lock(&self.mailbox.queue)?;
        let (mut queue, _) = self
            .mailbox
            .ready
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .map_err(|_| GuiError::StoreUnavailable("memory store lock poisoned".to_string()))?;
        Ok(queue.pop_front())
    }
}

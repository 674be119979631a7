//! Async helpers built on Session State and the pub/sub bridge
//!
//! - [`RenderSession::use_state`]: a value cell whose setter can be called
//!   from anywhere (typically a background thread) and whose new value is
//!   picked up by the next pass
//! - [`RenderSession::run_in_thread`](thread): run work off the render
//!   thread and show a placeholder until its result is published
//! - [`memo`]: per-session memoization of function results
//!
//! Background work never touches the render session. It talks to later
//! passes only through the shared store, wrapping every value as `{"y": value}`.

pub mod memo;
pub mod thread;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use uuid::Uuid;

use crate::error::GuiError;
use crate::pubsub::PubSub;
use crate::session::RenderSession;

pub use memo::{cache_in_session_state, Memoized, CACHE_SLOT};
pub use thread::RunOptions;

/// Field carrying the value inside a published payload
pub const PAYLOAD_FIELD: &str = "y";

/// Wrap `value` as `{"y": value}`
pub(crate) fn wrap_payload<T: Serialize + ?Sized>(value: &T) -> Result<Value, GuiError> {
    let value = serde_json::to_value(value).map_err(GuiError::NotSerializable)?;
    let mut payload = Map::new();
    payload.insert(PAYLOAD_FIELD.to_string(), value);
    Ok(Value::Object(payload))
}

/// Extract the value from a `{"y": value}` payload
pub(crate) fn take_payload(payload: Value) -> Option<Value> {
    match payload {
        Value::Object(mut fields) => fields.remove(PAYLOAD_FIELD),
        _ => None,
    }
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, GuiError> {
    serde_json::from_value(value).map_err(|e| GuiError::invalid_state(key, e.to_string()))
}

/// Readable name of a function or closure type: its last path segment, or
/// the enclosing function for closures
pub(crate) fn short_type_name<F: ?Sized>() -> &'static str {
    let full = std::any::type_name::<F>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::")
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .unwrap_or(path)
}

/// Publishes new values for one deferred-value cell
///
/// Setting a value does not rerun anything; the next pass that reads the
/// cell picks it up. Cheap to clone and safe to move into threads.
pub struct StateSetter<T> {
    bridge: PubSub,
    channel: String,
    ttl: Option<Duration>,
    _value: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            bridge: self.bridge.clone(),
            channel: self.channel.clone(),
            ttl: self.ttl,
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("channel", &self.channel)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<T: Serialize> StateSetter<T> {
    /// Publish a new value for the cell
    pub fn set(&self, value: &T) -> Result<(), GuiError> {
        self.bridge.publish(&self.channel, &wrap_payload(value)?, self.ttl)
    }

    /// Logical channel backing the cell
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl RenderSession {
    /// Deferred-value cell in the next positional slot
    ///
    /// Slots are numbered in call order within a pass (`use_state/1`,
    /// `use_state/2`, ...), so the same call sequence maps to the same cells
    /// across passes. Calls made conditionally shift later slots; give those a
    /// key with [`RenderSession::use_state_keyed`].
    pub fn use_state<T>(&mut self, initial: T) -> Result<(T, StateSetter<T>), GuiError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.use_state_count += 1;
        let key = format!("use_state/{}", self.use_state_count);
        self.deferred_cell(key, initial)
    }

    /// Deferred-value cell under an explicit Session State key
    pub fn use_state_keyed<T>(&mut self, key: &str, initial: T) -> Result<(T, StateSetter<T>), GuiError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.deferred_cell(key.to_string(), initial)
    }

    fn deferred_cell<T>(&mut self, key: String, initial: T) -> Result<(T, StateSetter<T>), GuiError>
    where
        T: Serialize + DeserializeOwned,
    {
        let channel = match self.state.get(&key) {
            Some(Value::String(channel)) => channel.clone(),
            Some(_) => return Err(GuiError::invalid_state(key, "expected a channel name")),
            None => {
                let channel = format!("use_state/{}", Uuid::new_v4());
                self.state.set(key, channel.clone());
                channel
            }
        };

        let published = self.poll(&[channel.as_str()])?.pop().flatten();
        let current = match published.and_then(take_payload) {
            Some(value) => {
                self.state.set(channel.clone(), value.clone());
                value
            }
            None => match self.state.get(&channel) {
                Some(value) => value.clone(),
                None => {
                    let value = serde_json::to_value(&initial).map_err(GuiError::NotSerializable)?;
                    self.state.set(channel.clone(), value.clone());
                    value
                }
            },
        };

        let value = decode(&channel, current)?;
        let setter = StateSetter {
            bridge: self.bridge.clone(),
            channel,
            ttl: self.defaults.state_ttl,
            _value: PhantomData,
        };
        Ok((value, setter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::MemoryStore;
    use crate::state::SessionState;
    use serde_json::json;

    fn session_with(state: SessionState, bridge: &PubSub) -> RenderSession {
        RenderSession::new(state, bridge.clone())
    }

    #[test]
    fn test_payload_wrapping() {
        assert_eq!(wrap_payload(&42).unwrap(), json!({"y": 42}));
        assert_eq!(take_payload(json!({"y": "v"})), Some(json!("v")));
        assert_eq!(take_payload(json!({"z": 1})), None);
        assert_eq!(take_payload(json!("ping")), None);
    }

    #[test]
    fn test_short_type_name() {
        fn generate_poem() {}
        fn name_of<F>(_: &F) -> &'static str {
            short_type_name::<F>()
        }
        assert_eq!(name_of(&generate_poem), "generate_poem");
        assert_eq!(name_of(&|| ()), "test_short_type_name");
    }

    #[test]
    fn test_use_state_starts_with_initial_value() {
        let bridge = PubSub::new(MemoryStore::shared());
        let mut s = session_with(SessionState::new(), &bridge);

        let (text, setter) = s.use_state(String::from("")).unwrap();
        assert_eq!(text, "");

        let channel = s.state().get_str("use_state/1").unwrap().to_string();
        assert!(channel.starts_with("use_state/"));
        assert_eq!(setter.channel(), channel);
        assert_eq!(s.state().get(&channel), Some(&json!("")));
        assert!(s.channels().contains(&bridge.wire_name(&channel)));
    }

    #[test]
    fn test_use_state_adopts_published_value_on_next_pass() {
        let bridge = PubSub::new(MemoryStore::shared());
        let mut first = session_with(SessionState::new(), &bridge);
        let (_, setter) = first.use_state(0u32).unwrap();
        let state = first.into_parts().state;

        // setter runs elsewhere, e.g. in a background thread
        let remote = setter.clone();
        std::thread::spawn(move || remote.set(&7).unwrap()).join().unwrap();

        let mut second = session_with(state, &bridge);
        let (value, _) = second.use_state(0u32).unwrap();
        assert_eq!(value, 7);

        let channel = setter.channel().to_string();
        assert_eq!(second.state().get(&channel), Some(&json!(7)));
    }

    #[test]
    fn test_use_state_slots_are_positional() {
        let bridge = PubSub::new(MemoryStore::shared());
        let mut s = session_with(SessionState::new(), &bridge);
        let (a, _) = s.use_state("a".to_string()).unwrap();
        let (b, _) = s.use_state("b".to_string()).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("a", "b"));
        assert!(s.state().contains_key("use_state/1"));
        assert!(s.state().contains_key("use_state/2"));
    }

    #[test]
    fn test_use_state_keyed() {
        let bridge = PubSub::new(MemoryStore::shared());
        let mut s = session_with(SessionState::new(), &bridge);
        let (v, _) = s.use_state_keyed("draft", vec![1, 2]).unwrap();
        assert_eq!(v, vec![1, 2]);
        assert!(s.state().contains_key("draft"));
        assert!(!s.state().contains_key("use_state/1"));
    }

    #[test]
    fn test_use_state_rejects_corrupt_slot() {
        let bridge = PubSub::new(MemoryStore::shared());
        let mut state = SessionState::new();
        state.set("use_state/1", 5);
        let mut s = session_with(state, &bridge);
        let err = s.use_state(0).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn test_setter_applies_state_ttl() {
        let store = MemoryStore::shared();
        let bridge = PubSub::new(store.clone());
        let mut s = session_with(SessionState::new(), &bridge);
        let (_, setter) = s.use_state(0).unwrap();
        setter.set(&1).unwrap();

        let ttl = store.ttl(&bridge.wire_name(setter.channel())).unwrap();
        assert!(ttl <= Duration::from_secs(60));
    }
}

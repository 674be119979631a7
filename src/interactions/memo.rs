//! Per-session memoization
//!
//! Results are stored in Session State under [`CACHE_SLOT`], keyed by
//! `<function name>:<sha256 of the JSON-encoded arguments>`. Entries are
//! never evicted by the engine; they live as long as the caller keeps
//! sending the state back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{decode, short_type_name};
use crate::error::GuiError;
use crate::key;
use crate::session::RenderSession;
use crate::state::SessionState;

/// Session State key holding the memo table
pub const CACHE_SLOT: &str = "__cache__";

/// Memo table key for one call
pub fn cache_key<A: Serialize + ?Sized>(name: &str, args: &A) -> Result<String, GuiError> {
    let encoded = serde_json::to_string(args).map_err(GuiError::NotSerializable)?;
    Ok(format!("{}:{}", name, key::digest(&encoded)))
}

/// Return the memoized result of `f(args)`, computing it on a miss
pub fn cache_in_session_state<A, T, F>(
    state: &mut SessionState,
    name: &str,
    args: &A,
    f: F,
) -> Result<T, GuiError>
where
    A: Serialize + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce(&A) -> T,
{
    cached_in_slot(state, CACHE_SLOT, name, args, f)
}

fn cached_in_slot<A, T, F>(
    state: &mut SessionState,
    slot: &str,
    name: &str,
    args: &A,
    f: F,
) -> Result<T, GuiError>
where
    A: Serialize + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce(&A) -> T,
{
    let entry = cache_key(name, args)?;

    let table = match state.set_default(slot, Value::Object(Map::new())) {
        Value::Object(table) => table,
        _ => return Err(GuiError::invalid_state(slot, "memo table is not an object")),
    };
    if let Some(hit) = table.get(&entry) {
        return decode(&entry, hit.clone());
    }

    let result = f(args);
    let encoded = serde_json::to_value(&result).map_err(GuiError::NotSerializable)?;
    table.insert(entry, encoded);
    Ok(result)
}

/// A function whose results are memoized in Session State
///
/// ```
/// use gooey_gui::interactions::Memoized;
/// use gooey_gui::SessionState;
///
/// fn square(x: &i64) -> i64 { x * x }
///
/// let mut state = SessionState::new();
/// let square = Memoized::new(square);
/// assert_eq!(square.call(&mut state, &3).unwrap(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct Memoized<F> {
    name: String,
    slot: String,
    f: F,
}

impl<F> Memoized<F> {
    /// Wrap `f`, naming its cache entries after the function
    pub fn new(f: F) -> Self {
        Self {
            name: short_type_name::<F>().to_string(),
            slot: CACHE_SLOT.to_string(),
            f,
        }
    }

    /// Name used as the cache key prefix
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Keep the memo table under a different Session State key
    pub fn in_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = slot.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call<A, T>(&self, state: &mut SessionState, args: &A) -> Result<T, GuiError>
    where
        F: Fn(&A) -> T,
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
    {
        cached_in_slot(state, &self.slot, &self.name, args, |a| (self.f)(a))
    }
}

impl RenderSession {
    /// Memoize `f(args)` in this session's state
    pub fn cache_in_session_state<A, T, F>(&mut self, name: &str, args: &A, f: F) -> Result<T, GuiError>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce(&A) -> T,
    {
        cache_in_session_state(&mut self.state, name, args, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_second_call_hits_cache() {
        let calls = Cell::new(0);
        let f = |x: &i64| {
            calls.set(calls.get() + 1);
            x * 14
        };

        let mut state = SessionState::new();
        assert_eq!(cache_in_session_state(&mut state, "f", &3, f).unwrap(), 42);
        assert_eq!(cache_in_session_state(&mut state, "f", &3, f).unwrap(), 42);
        assert_eq!(calls.get(), 1);

        assert_eq!(cache_in_session_state(&mut state, "f", &4, f).unwrap(), 56);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_table_layout() {
        let mut state = SessionState::new();
        let _: String = cache_in_session_state(&mut state, "greet", &("Ada", 1), |(n, _)| format!("hi {n}")).unwrap();

        let entry = cache_key("greet", &("Ada", 1)).unwrap();
        assert!(entry.starts_with("greet:"));
        assert_eq!(entry.len(), "greet:".len() + 64);
        assert_eq!(state.get(CACHE_SLOT).unwrap()[&entry], json!("hi Ada"));
    }

    #[test]
    fn test_names_separate_entries() {
        let mut state = SessionState::new();
        let a: i32 = cache_in_session_state(&mut state, "a", &1, |x| x + 1).unwrap();
        let b: i32 = cache_in_session_state(&mut state, "b", &1, |x| x + 2).unwrap();
        assert_eq!((a, b), (2, 3));
    }

    #[test]
    fn test_cache_survives_state_round_trip() {
        let mut state = SessionState::new();
        let _: i32 = cache_in_session_state(&mut state, "f", &5, |x| x * 2).unwrap();

        let wire = serde_json::to_string(&state).unwrap();
        let mut restored: SessionState = serde_json::from_str(&wire).unwrap();
        let again: i32 = cache_in_session_state(&mut restored, "f", &5, |_| panic!("recomputed")).unwrap();
        assert_eq!(again, 10);
    }

    #[test]
    fn test_corrupt_table_is_reported() {
        let mut state = SessionState::new();
        state.set(CACHE_SLOT, "not a table");
        let err = cache_in_session_state(&mut state, "f", &1, |x: &i32| *x).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn test_memoized_wrapper() {
        fn slow_square(x: &u64) -> u64 {
            x * x
        }

        let mut state = SessionState::new();
        let memo = Memoized::new(slow_square);
        assert_eq!(memo.name(), "slow_square");
        assert_eq!(memo.call(&mut state, &3).unwrap(), 9);

        let entry = cache_key("slow_square", &3).unwrap();
        assert!(state.get(CACHE_SLOT).unwrap().get(&entry).is_some());

        let custom = Memoized::new(slow_square).named("sq").in_slot("__memo__");
        assert_eq!(custom.call(&mut state, &4).unwrap(), 16);
        assert!(state.contains_key("__memo__"));
    }
}

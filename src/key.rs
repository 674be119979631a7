//! Deterministic key derivation
//!
//! Widgets without an explicit key identify their Session State slot by a
//! fingerprint of their identity inputs (label, options, ...). The fingerprint
//! is the SHA-256 of a canonical string: the namespace followed by the JSON
//! encoding of every input, joined with `.`. JSON quoting keeps `["a.b"]` and
//! `["a", "b"]` apart, and the join keeps the result order-sensitive.
//!
//! Two call sites with identical inputs and no explicit key share a slot.
//! That is not detected; pass an explicit key to tell them apart.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::GuiError;

/// Hex-encoded SHA-256 of `input`
pub fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Canonical string form hashed by [`fingerprint`]
pub fn canonical_form(namespace: &str, inputs: &[Value]) -> String {
    let mut out = String::from(namespace);
    for input in inputs {
        out.push('.');
        out.push_str(&input.to_string());
    }
    out
}

/// Fingerprint a namespace tag and an ordered list of inputs
pub fn fingerprint(namespace: &str, inputs: &[Value]) -> String {
    digest(&canonical_form(namespace, inputs))
}

/// Fingerprint any serializable value under a namespace
pub fn fingerprint_of<T: Serialize + ?Sized>(namespace: &str, input: &T) -> Result<String, GuiError> {
    let value = serde_json::to_value(input).map_err(GuiError::NotSerializable)?;
    Ok(fingerprint(namespace, std::slice::from_ref(&value)))
}

/// Session State key for a widget
///
/// Returns the explicit key when one is given, otherwise the fingerprint of
/// the widget's identity inputs.
pub fn widget_key(explicit: Option<&str>, namespace: &str, inputs: &[Value]) -> String {
    match explicit {
        Some(key) => key.to_string(),
        None => fingerprint(namespace, inputs),
    }
}

/// Fingerprint a namespace and a list of serializable expressions
///
/// ```
/// let key = gooey_gui::fingerprint!("select", "Colour", ["red", "green"]);
/// assert_eq!(key.len(), 64);
/// ```
#[macro_export]
macro_rules! fingerprint {
    ($namespace:expr $(, $input:expr)* $(,)?) => {
        $crate::key::fingerprint($namespace, &[$($crate::serde_json::json!($input)),*])
    };
}

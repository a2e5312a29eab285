//! Recovery of a structured analysis from raw model text.
//!
//! Strategies run in order and the first success wins. Each one is a pure
//! function so it can be reordered or tested on its own.

use serde_json::Value;
use tracing::debug;

pub type Strategy = fn(&str) -> Option<Value>;

pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("strict", parse_strict),
    ("trailing-object", parse_trailing_object),
];

/// Returns the first value any strategy recovers, or `None`.
///
/// A JSON object followed by commentary is not recovered: the trailing
/// strategy only matches text that ends in `}`.
pub fn recover(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(raw) {
            debug!("structured output recovered by {} strategy", name);
            return Some(value);
        }
    }
    debug!("no structured output recovered from {} bytes", raw.len());
    None
}

/// Like [`recover`], but only accepts an object (the analysis root).
pub fn recover_object(raw: &str) -> Option<Value> {
    recover(raw).filter(Value::is_object)
}

pub fn parse_strict(raw: &str) -> Option<Value> {
    serde_json::from_str(raw).ok()
}

/// Parses the span from the first `{` to the end, when the text ends in `}`.
pub fn parse_trailing_object(raw: &str) -> Option<Value> {
    if !raw.ends_with('}') {
        return None;
    }
    let start = raw.find('{')?;
    serde_json::from_str(&raw[start..]).ok()
}

//! Tool calls decided by the model, and normalization of its JSON replies.
//!
//! Models are inconsistent about the envelope: some reply with
//! `{"actions": [...]}`, some with `{"tools": [...]}`, some with a bare list
//! and some with a single call object. All of them collapse to `Vec<Action>`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One tool call: `{ "tool": "<name>", ...arguments }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Empty when the model omitted the field; dispatched as an unknown tool.
    #[serde(default)]
    pub tool: String,
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

impl Action {
    /// Non-object `args` are discarded.
    #[must_use]
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            tool: tool.into(),
            args,
        }
    }

    /// A spoken reply with no side effects.
    #[must_use]
    pub fn response(text: impl Into<String>) -> Self {
        let mut args = Map::new();
        args.insert("text".to_string(), Value::String(text.into()));
        Self {
            tool: "response".to_string(),
            args,
        }
    }

    #[must_use]
    pub fn args_value(&self) -> Value {
        Value::Object(self.args.clone())
    }

    #[must_use]
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Error)]
#[error("model reply is not valid JSON: {0}")]
pub struct ActionParseError(#[from] serde_json::Error);

/// Collapse any supported reply envelope into a list of actions.
///
/// Items that are not objects (or carry a non-string `tool`) are dropped.
#[must_use]
pub fn normalize_actions(value: Value) -> Vec<Action> {
    let value = match value {
        Value::Object(mut map) => {
            if let Some(inner) = map.remove("actions") {
                inner
            } else if let Some(inner) = map.remove("tools") {
                inner
            } else {
                Value::Object(map)
            }
        }
        other => other,
    };

    match value {
        Value::Array(items) => items.into_iter().filter_map(action_from_value).collect(),
        single @ Value::Object(_) => action_from_value(single).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Parse raw model text and normalize it.
pub fn parse_model_reply(text: &str) -> Result<Vec<Action>, ActionParseError> {
    let value: Value = serde_json::from_str(text.trim())?;
    Ok(normalize_actions(value))
}

fn action_from_value(value: Value) -> Option<Action> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

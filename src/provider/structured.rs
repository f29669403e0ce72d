// src/provider/structured.rs — Schema-directed coercion of model text into typed values

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::infra::errors::RefineError;

/// A JSON schema plus the name it is reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredSchema {
    pub name: String,
    pub schema: Value,
}

impl StructuredSchema {
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        Self {
            name: T::schema_name(),
            // RootSchema always serializes; an open schema is the fallback
            schema: serde_json::to_value(root).unwrap_or(Value::Bool(true)),
        }
    }

    /// Instruction appended to a prompt so the model answers with matching JSON.
    pub fn instruction(&self) -> String {
        let pretty =
            serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string());
        format!(
            "Respond ONLY with a JSON object named {} that matches this JSON schema. \
             Do not add commentary outside the JSON.\n\n{}",
            self.name, pretty
        )
    }
}

/// Pull the first JSON value out of free-form model output.
///
/// Handles fenced ```json blocks, bare objects, and objects embedded in prose.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(fenced.trim()) {
            return Some(v);
        }
    }

    let start = trimmed.find(['{', '['])?;
    balanced_span(&trimmed[start..]).and_then(|span| serde_json::from_str(span).ok())
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // Skip an optional language tag on the fence line
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Slice from an opening bracket to its matching close, respecting strings.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Deserialize an already-extracted value into `T`.
pub fn from_value<T: DeserializeOwned>(value: Value, schema: &str) -> Result<T, RefineError> {
    serde_json::from_value(value).map_err(|e| RefineError::Structured {
        schema: schema.to_string(),
        message: e.to_string(),
    })
}

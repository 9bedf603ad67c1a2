use crate::error::{AdapterError, Result};
use crate::types::{ToolInvocation, ToolOutcome, VendorToolResponseFragment};
use crate::vendor::{ArgumentsEncoding, ResultStyle, VendorProfile};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

pub(crate) fn extract_response_fragment(
    body: &Value,
    profile: &VendorProfile,
) -> Result<VendorToolResponseFragment> {
    match body.pointer(profile.response.body_pointer) {
        None => Ok(VendorToolResponseFragment::default()),
        Some(calls) => VendorToolResponseFragment::from_value(calls.clone()),
    }
}

/// All-or-nothing: one bad call fails the whole response. Ids are unique
/// within the result.
pub(crate) fn decode_response(
    raw: &VendorToolResponseFragment,
    profile: &VendorProfile,
) -> Result<Vec<ToolInvocation>> {
    let shape = &profile.response;
    let mut out: Vec<ToolInvocation> = Vec::new();
    let mut ids = HashSet::new();

    for entry in raw.calls().iter().filter(|e| shape.filter.matches(e)) {
        let index = out.len();
        let call = match shape.call_key {
            Some(key) => entry.get(key).ok_or_else(|| {
                AdapterError::ResponseFormat(format!(
                    "{} tool call {index} has no {key} object: {entry}",
                    profile.id
                ))
            })?,
            None => entry,
        };

        let tool_name = match call.get(shape.name_key).and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(AdapterError::ResponseFormat(format!(
                    "{} tool call {index} has no {}: {entry}",
                    profile.id, shape.name_key
                )));
            }
        };

        let id = shape
            .id_key
            .and_then(|key| entry.get(key))
            .and_then(Value::as_str)
            .filter(|id| !profile.is_absent_id(id))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}:{index}", profile.id));

        if !ids.insert(id.clone()) {
            return Err(AdapterError::ResponseFormat(format!(
                "{} tool call {index} reuses id {id:?}",
                profile.id
            )));
        }

        let arguments = decode_arguments(index, call.get(shape.arguments_key))?;

        out.push(ToolInvocation {
            id,
            tool_name,
            arguments,
        });
    }

    Ok(out)
}

/// Accepts a JSON-object string or an already decoded object. Missing, null
/// and blank payloads are an empty argument map.
fn decode_arguments(index: usize, raw: Option<&Value>) -> Result<Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) => {
            if s.trim().is_empty() {
                return Ok(Map::new());
            }
            match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(other) => Err(AdapterError::MalformedArguments {
                    index,
                    raw: s.clone(),
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                }),
                Err(e) => Err(AdapterError::MalformedArguments {
                    index,
                    raw: s.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        Some(other) => Err(AdapterError::MalformedArguments {
            index,
            raw: other.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn encode_invocations(
    invocations: &[ToolInvocation],
    profile: &VendorProfile,
) -> Result<Value> {
    let shape = &profile.response;
    let mut out = Vec::with_capacity(invocations.len());

    for invocation in invocations {
        let arguments = match shape.arguments {
            ArgumentsEncoding::JsonString => {
                Value::String(serde_json::to_string(&invocation.arguments)?)
            }
            ArgumentsEncoding::Inline => Value::Object(invocation.arguments.clone()),
        };

        let mut call = Map::new();
        call.insert(
            shape.name_key.to_string(),
            Value::String(invocation.tool_name.clone()),
        );
        call.insert(shape.arguments_key.to_string(), arguments);

        let mut entry = Map::new();
        if let Some(key) = shape.id_key {
            entry.insert(key.to_string(), Value::String(invocation.id.clone()));
        }
        if let Some((key, value)) = shape.type_tag {
            entry.insert(key.to_string(), Value::String(value.to_string()));
        }
        match shape.call_key {
            Some(key) => {
                entry.insert(key.to_string(), Value::Object(call));
            }
            None => entry.extend(call),
        }
        out.push(Value::Object(entry));
    }

    Ok(Value::Array(out))
}

pub(crate) fn encode_tool_results(
    outcomes: &[ToolOutcome],
    profile: &VendorProfile,
) -> Result<Value> {
    if outcomes.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }

    let messages = match profile.results {
        ResultStyle::ToolMessages { include_name } => outcomes
            .iter()
            .map(|o| -> Result<Value> {
                let mut message = Map::new();
                message.insert("role".to_string(), json!("tool"));
                message.insert("tool_call_id".to_string(), json!(o.invocation_id));
                if include_name {
                    message.insert("name".to_string(), json!(o.tool_name));
                }
                message.insert("content".to_string(), Value::String(content_text(&o.content)?));
                Ok(Value::Object(message))
            })
            .collect::<Result<Vec<_>>>()?,
        ResultStyle::ToolResultBlocks => {
            let blocks = outcomes
                .iter()
                .map(|o| -> Result<Value> {
                    let mut block = json!({
                        "type": "tool_result",
                        "tool_use_id": o.invocation_id,
                        "content": content_text(&o.content)?,
                    });
                    if o.is_error {
                        block["is_error"] = Value::Bool(true);
                    }
                    Ok(block)
                })
                .collect::<Result<Vec<_>>>()?;
            vec![json!({ "role": "user", "content": blocks })]
        }
        ResultStyle::FunctionResponseParts => {
            let parts = outcomes
                .iter()
                .map(|o| {
                    let response = match (&o.content, o.is_error) {
                        (content, true) => json!({ "error": content }),
                        (Value::Object(map), false) => Value::Object(map.clone()),
                        (content, false) => json!({ "content": content }),
                    };
                    json!({ "functionResponse": { "name": o.tool_name, "response": response } })
                })
                .collect::<Vec<_>>();
            vec![json!({ "role": "function", "parts": parts })]
        }
    };

    Ok(Value::Array(messages))
}

/// Strings pass through; anything else is sent as its JSON text.
fn content_text(content: &Value) -> Result<String> {
    match content {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

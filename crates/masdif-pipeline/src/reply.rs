// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shaping of dialog engine replies and tracker data.

use serde_json::{Map, Value, json};
use tracing::warn;

/// Keys removed from tracker events before they are stored.
pub const EVENT_FILTER_KEYS: &[&str] = &["parse_data", "metadata", "custom", "message_id", "timestamp"];

/// Keys removed from the latest NLU result before it is stored.
pub const NLU_FILTER_KEYS: &[&str] = &["metadata", "message_id"];

/// Turns any reply body into an ordered list of element objects.
///
/// A bare object becomes a one-element list; `null` and scalars become an
/// empty list. Non-object array entries are dropped.
pub fn normalize(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter(|item| {
                let keep = item.is_object();
                if !keep {
                    warn!(element = %item, "dropping non-object reply element");
                }
                keep
            })
            .collect(),
        obj @ Value::Object(_) => vec![obj],
        _ => Vec::new(),
    }
}

/// Removes every element carrying a `custom` key and returns the last
/// custom payload, decoded and with snake_case keys.
///
/// String payloads are parsed as JSON; a string that is not JSON is kept
/// verbatim. Remaining elements keep their order.
pub fn extract_custom(elements: &mut Vec<Value>) -> Option<Value> {
    let mut action_reply = None;
    elements.retain(|element| match element.get("custom") {
        Some(custom) => {
            let decoded = match custom {
                Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                    warn!(error = %e, "custom reply is not JSON, storing raw text");
                    Value::String(raw.clone())
                }),
                other => other.clone(),
            };
            action_reply = Some(snake_case_keys(decoded));
            false
        }
        None => true,
    });
    action_reply
}

/// Recursively converts object keys to snake_case.
pub fn snake_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (to_snake_case(&k), snake_case_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_keys).collect()),
        other => other,
    }
}

/// `camelCase`, `PascalCase`, `HTTPServer` and `kebab-case` to snake_case.
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Space-joined text of all elements, used as TTS input.
pub fn speech_text(elements: &[Value]) -> String {
    elements
        .iter()
        .filter_map(|e| e.get("text").and_then(Value::as_str))
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Adds the audio attachment to `element.data.attachment`.
pub fn attach_audio(element: &mut Value, src: &str) {
    let Some(obj) = element.as_object_mut() else {
        return;
    };
    let attachment = json!([{"type": "audio", "payload": {"src": src}}]);
    match obj.get_mut("data").and_then(Value::as_object_mut) {
        Some(data) => {
            data.insert("attachment".into(), attachment);
        }
        None => {
            obj.insert("data".into(), json!({ "attachment": attachment }));
        }
    }
}

/// Adds metadata and correlation ids to every element.
pub fn append_correlation(
    elements: &mut [Value],
    metadata: &Value,
    message_id: &str,
    recipient_id: &str,
) {
    for element in elements.iter_mut() {
        if let Some(obj) = element.as_object_mut() {
            obj.insert("metadata".into(), metadata.clone());
            obj.insert("message_id".into(), Value::from(message_id));
            obj.insert("recipient_id".into(), Value::from(recipient_id));
        }
    }
}

/// The canonical empty response: one element holding only correlation data.
pub fn empty_response(metadata: Value, message_id: &str, recipient_id: &str) -> Vec<Value> {
    vec![json!({
        "metadata": metadata,
        "message_id": message_id,
        "recipient_id": recipient_id,
    })]
}

/// Recursively removes `keys` from every object inside `value`.
pub fn filter_keys(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(map) => {
            let filtered: Map<String, Value> = map
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), filter_keys(v, keys)))
                .collect();
            Value::Object(filtered)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| filter_keys(v, keys)).collect()),
        other => other.clone(),
    }
}

/// Events strictly newer than `cursor`. Events without a timestamp are skipped.
pub fn events_after(events: &[Value], cursor: f64) -> Vec<Value> {
    events
        .iter()
        .filter(|e| {
            e.get("timestamp")
                .and_then(Value::as_f64)
                .is_some_and(|ts| ts > cursor)
        })
        .cloned()
        .collect()
}

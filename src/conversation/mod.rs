use serde_json::Value;

use crate::{
    error::AppError,
    model::message::{Message, Role},
};

/// Take the last `window` raw entries and keep the well-formed messages among
/// them. The window counts raw entries, so malformed ones still use up slots.
/// Anything that is not an array yields nothing.
pub fn normalize_history(raw: &Value, window: usize) -> Vec<Message> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    let recent = &items[items.len().saturating_sub(window)..];
    recent.iter().filter_map(parse_message).collect()
}

/// Same filtering without a window, used by the exporters.
pub fn normalize_all(raw: &Value) -> Vec<Message> {
    normalize_history(raw, usize::MAX)
}

/// Shape check for export payloads: a non-empty array whose elements all
/// carry `role` and `content`.
pub fn validate_export_history(raw: &Value) -> Result<(), AppError> {
    let items = match raw.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => return Err(AppError::BadRequest("No chat history provided".into())),
    };

    let well_formed = items.iter().all(|item| {
        item.as_object()
            .map(|obj| obj.contains_key("role") && obj.contains_key("content"))
            .unwrap_or(false)
    });

    if !well_formed {
        return Err(AppError::BadRequest("Invalid message format".into()));
    }
    Ok(())
}

fn parse_message(item: &Value) -> Option<Message> {
    let obj = item.as_object()?;
    let role = obj.get("role").and_then(Value::as_str).and_then(Role::parse)?;
    let content = obj.get("content").and_then(Value::as_str)?;
    Some(Message::new(role, content))
}

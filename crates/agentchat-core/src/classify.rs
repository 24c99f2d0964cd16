use serde_json::Value;

/// Role of a message record in the conversation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Human,
    Ai,
    Tool,
    /// Shape not recognized; the record is kept in the sequence but never
    /// rendered.
    Unknown,
}

/// Classify a raw message record by its discriminator field.
///
/// Primary discriminator is `"type"` (with `"role"` as a fallback key) using
/// the common aliases `user`/`human` and `assistant`/`ai`. Some producers
/// omit the discriminator on assistant messages and only mark them
/// structurally with a `tool_calls` list, so that shape classifies as AI too.
pub fn classify_role(message: &Value) -> Role {
    let tag = message
        .get("type")
        .or_else(|| message.get("role"))
        .and_then(|v| v.as_str());

    match tag {
        Some("human") | Some("user") => Role::Human,
        Some("ai") | Some("assistant") => Role::Ai,
        Some("tool") => Role::Tool,
        _ => {
            let has_tool_calls = message
                .get("tool_calls")
                .map(Value::is_array)
                .unwrap_or(false);
            if has_tool_calls && message.get("tool_call_id").is_none() {
                Role::Ai
            } else {
                Role::Unknown
            }
        }
    }
}

/// Flatten a message `content` value to display text.
///
/// Content arrives either as a plain string or as an ordered list of
/// fragments (strings, or objects carrying a `text` field). Concatenation
/// preserves fragment order; unrecognized fragments contribute nothing.
/// Total: never fails, `null`/absent flattens to the empty string.
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(fragments) => fragments.iter().map(fragment_text).collect(),
        Value::Object(map) => match map.get("text") {
            Some(text) => coerce_str(text),
            None => content.to_string(),
        },
        other => coerce_str(other),
    }
}

fn fragment_text(fragment: &Value) -> String {
    match fragment {
        Value::String(s) => s.clone(),
        Value::Object(map) => map.get("text").map(coerce_str).unwrap_or_default(),
        _ => String::new(),
    }
}

fn coerce_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_by_type_field() {
        assert_eq!(classify_role(&json!({"type": "human", "content": "hi"})), Role::Human);
        assert_eq!(classify_role(&json!({"type": "ai", "content": "hello"})), Role::Ai);
        assert_eq!(classify_role(&json!({"type": "tool", "tool_call_id": "t1"})), Role::Tool);
    }

    #[test]
    fn test_classify_role_aliases() {
        assert_eq!(classify_role(&json!({"role": "user", "content": "hi"})), Role::Human);
        assert_eq!(classify_role(&json!({"role": "assistant", "content": "ok"})), Role::Ai);
    }

    #[test]
    fn test_classify_structural_ai_fallback() {
        // No discriminator at all, but a tool_calls list marks an AI message
        let msg = json!({"content": "", "tool_calls": [{"id": "t1", "name": "search"}]});
        assert_eq!(classify_role(&msg), Role::Ai);

        // A tool_call_id means this is a result record, not an AI message
        let result = json!({"content": "42", "tool_call_id": "t1", "tool_calls": []});
        assert_eq!(classify_role(&result), Role::Unknown);
    }

    #[test]
    fn test_classify_malformed_is_unknown() {
        assert_eq!(classify_role(&json!(null)), Role::Unknown);
        assert_eq!(classify_role(&json!("just a string")), Role::Unknown);
        assert_eq!(classify_role(&json!({"type": 42})), Role::Unknown);
        assert_eq!(classify_role(&json!({"kind": "ai"})), Role::Unknown);
    }

    #[test]
    fn test_extract_text_plain_string() {
        assert_eq!(extract_text(&json!("hello")), "hello");
    }

    #[test]
    fn test_extract_text_fragment_list() {
        let content = json!([{"text": "a"}, "b", {"text": "c"}]);
        assert_eq!(extract_text(&content), "abc");
    }

    #[test]
    fn test_extract_text_single_object() {
        assert_eq!(extract_text(&json!({"text": "x"})), "x");
    }

    #[test]
    fn test_extract_text_null_is_empty() {
        assert_eq!(extract_text(&Value::Null), "");
    }

    #[test]
    fn test_extract_text_keeps_unrecognized_fragments_silent() {
        // Fragments with no text field contribute nothing but don't error
        let content = json!([{"image_url": "http://example.com/a.png"}, "tail"]);
        assert_eq!(extract_text(&content), "tail");
    }

    #[test]
    fn test_extract_text_coerces_scalars() {
        assert_eq!(extract_text(&json!(42)), "42");
        assert_eq!(extract_text(&json!({"text": 7})), "7");
    }
}

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::classify::{classify_role, extract_text, Role};

/// Spread between the synthetic ordering keys of adjacent messages. All tool
/// calls in one AI message share a bucket; the sort is stable, so their
/// original order carries through. Ties only become possible past 1000 calls
/// in a single bucket.
const SEQUENCE_STRIDE: u64 = 1000;

/// A tool invocation embedded in an AI message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// The result record matched to a tool call, once it has arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub key: String,
    pub text: String,
}

/// Derived lifecycle state of one tool call. Rebuilt on every reconciliation
/// pass, never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallState {
    pub call: ToolCall,
    /// `None` until the matching tool message shows up in the sequence.
    pub result: Option<ToolResult>,
    pub owner_key: String,
    pub sequence_index: u64,
}

impl ToolCallState {
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// One entry of the render sequence. Tool-role messages never appear here;
/// their content is reachable only through the owning AI entry's tool calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatItem {
    pub key: String,
    pub role: Role,
    pub text: String,
    pub tool_calls: Vec<ToolCallState>,
}

impl ChatItem {
    /// An AI entry with no text and no tool calls draws no bubble.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.tool_calls.is_empty()
    }
}

/// The full derived view handed to the render layer. Owned by one render
/// cycle; the next sequence change replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatView {
    pub items: Vec<ChatItem>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ChatView {
    /// Index of the render item the loading cursor attaches to.
    pub fn cursor_index(&self) -> Option<usize> {
        if self.is_loading {
            self.items.len().checked_sub(1)
        } else {
            None
        }
    }

    /// Whether the error bubble folds into the last item's card. That only
    /// happens when the last item is an AI message; otherwise the error
    /// renders standalone at the tail.
    pub fn error_on_last_item(&self) -> bool {
        self.error.is_some()
            && self
                .items
                .last()
                .map(|item| item.role == Role::Ai)
                .unwrap_or(false)
    }

    /// Ordered tool-call states for the AI entry with the given key.
    pub fn tool_calls_for(&self, key: &str) -> Option<&[ToolCallState]> {
        self.items
            .iter()
            .find(|item| item.key == key && item.role == Role::Ai)
            .map(|item| item.tool_calls.as_slice())
    }
}

/// List identity for rendering. Never used for correlation; tool results
/// match on `tool_call_id` alone.
pub fn display_key(message: &Value, index: usize) -> String {
    match message.get("id").and_then(|v| v.as_str()) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("msg-{index}"),
    }
}

/// Rebuild the derived view from the full current sequence.
///
/// Pure function of its inputs: the same sequence always yields the same
/// view, and a sequence that only grew keeps every match it already had.
/// Position in the sequence is the only ordering signal; timestamps are
/// neither required nor trusted.
pub fn reconcile(messages: &[Value], is_loading: bool, error: Option<&str>) -> ChatView {
    let known_call_ids = all_tool_call_ids(messages);
    let mut items = Vec::with_capacity(messages.len());

    for (index, message) in messages.iter().enumerate() {
        match classify_role(message) {
            Role::Human => items.push(ChatItem {
                key: display_key(message, index),
                role: Role::Human,
                text: content_text(message),
                tool_calls: Vec::new(),
            }),
            Role::Ai => {
                let key = display_key(message, index);
                let tool_calls = tool_call_states(message, index, &key, messages);
                items.push(ChatItem {
                    key,
                    role: Role::Ai,
                    text: content_text(message),
                    tool_calls,
                });
            }
            Role::Tool => {
                // Folded into the owning AI entry. A result that matches no
                // known call is dropped, not shown and not an error.
                let call_id = message.get("tool_call_id").and_then(|v| v.as_str());
                if !call_id.map(|id| known_call_ids.contains(id)).unwrap_or(false) {
                    debug!(call_id, "dropping tool result with no owning call");
                }
            }
            Role::Unknown => {
                debug!(index, "skipping message with unrecognized shape");
            }
        }
    }

    ChatView {
        items,
        is_loading,
        error: error.map(str::to_string),
    }
}

fn content_text(message: &Value) -> String {
    extract_text(message.get("content").unwrap_or(&Value::Null))
}

fn all_tool_call_ids(messages: &[Value]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for message in messages {
        if classify_role(message) != Role::Ai {
            continue;
        }
        for call in parse_tool_calls(message) {
            ids.insert(call.id);
        }
    }
    ids
}

fn tool_call_states(
    message: &Value,
    message_index: usize,
    owner_key: &str,
    messages: &[Value],
) -> Vec<ToolCallState> {
    let calls = parse_tool_calls(message);
    if calls.is_empty() {
        return Vec::new();
    }

    let wanted: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();

    // One scan over the whole sequence: results may land before or after the
    // pass that first sees their call.
    let mut candidates: Vec<(usize, String, &Value)> = Vec::new();
    for (index, candidate) in messages.iter().enumerate() {
        if classify_role(candidate) != Role::Tool {
            continue;
        }
        if let Some(call_id) = candidate.get("tool_call_id").and_then(|v| v.as_str()) {
            if wanted.contains(call_id) {
                candidates.push((index, call_id.to_string(), candidate));
            }
        }
    }

    let sequence_index = message_index as u64 * SEQUENCE_STRIDE;
    let mut states: Vec<ToolCallState> = calls
        .into_iter()
        .map(|call| {
            // First match in sequence order wins. If upstream reuses an id
            // across turns this can attach the wrong result; the matching key
            // stays tool_call_id until the producer guarantees uniqueness.
            let result = candidates
                .iter()
                .find(|(_, id, _)| *id == call.id)
                .map(|(index, _, msg)| ToolResult {
                    key: display_key(msg, *index),
                    text: content_text(msg),
                });
            ToolCallState {
                call,
                result,
                owner_key: owner_key.to_string(),
                sequence_index,
            }
        })
        .collect();

    states.sort_by_key(|state| state.sequence_index);
    states
}

fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    let Some(list) = message.get("tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .map(|entry| ToolCall {
            id: entry
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            name: entry
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            arguments: entry
                .get("args")
                .or_else(|| entry.get("arguments"))
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect()
}

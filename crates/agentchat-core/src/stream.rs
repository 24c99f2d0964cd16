use serde_json::{json, Value};
use tracing::debug;

use crate::classify::{classify_role, extract_text, Role};
use crate::reconcile::{reconcile, ChatView};
use crate::transport::SubmitRequest;

/// One transport-originated mutation of the message sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// Authoritative replacement of the full sequence.
    Snapshot(Vec<Value>),
    /// Append one message, or replace in place when its id already exists.
    Message(Value),
    /// Tokens for the trailing AI message.
    TextDelta(String),
    Done,
    Error(String),
}

/// The live message sequence plus stream status. The transport is the only
/// writer (through [`ChatStream::apply`]); everything downstream reads the
/// derived [`ChatView`], rebuilt from scratch on demand.
#[derive(Debug, Default)]
pub struct ChatStream {
    pub messages: Vec<Value>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ChatStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate a user submission. Returns `None` (a no-op, not an error) when
    /// the trimmed text is empty or a submission is already in flight.
    /// Otherwise the human message lands in the local sequence immediately
    /// and the caller gets the request to hand to the transport.
    pub fn begin_submission(&mut self, text: &str) -> Option<SubmitRequest> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if self.is_loading {
            debug!("submission ignored, one already in flight");
            return None;
        }

        self.messages.push(json!({"type": "human", "content": trimmed}));
        self.is_loading = true;
        self.error = None;
        Some(SubmitRequest::human(trimmed))
    }

    pub fn apply(&mut self, update: StreamUpdate) {
        match update {
            StreamUpdate::Snapshot(messages) => self.messages = messages,
            StreamUpdate::Message(message) => self.merge_message(message),
            StreamUpdate::TextDelta(delta) => self.append_delta(&delta),
            StreamUpdate::Done => self.is_loading = false,
            StreamUpdate::Error(error) => {
                self.is_loading = false;
                self.error = Some(error);
            }
        }
    }

    /// Rebuild the derived view for the current sequence.
    pub fn view(&self) -> ChatView {
        reconcile(&self.messages, self.is_loading, self.error.as_deref())
    }

    fn merge_message(&mut self, message: Value) {
        let id = message
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if let Some(id) = id {
            let existing = self
                .messages
                .iter_mut()
                .find(|m| m.get("id").and_then(|v| v.as_str()) == Some(id.as_str()));
            if let Some(slot) = existing {
                *slot = message;
                return;
            }
        }
        self.messages.push(message);
    }

    fn append_delta(&mut self, delta: &str) {
        // Only the trailing message can be mid-stream; an AI message earlier
        // in the sequence belongs to a finished turn and is never reopened.
        let trailing_ai = self
            .messages
            .last_mut()
            .filter(|m| classify_role(m) == Role::Ai);

        match trailing_ai {
            Some(Value::Object(message)) => {
                let text = match message.get("content") {
                    Some(Value::String(existing)) => format!("{existing}{delta}"),
                    Some(other) => format!("{}{delta}", extract_text(other)),
                    None => delta.to_string(),
                };
                message.insert("content".to_string(), Value::String(text));
            }
            // A delta with no AI message yet opens the agent's turn
            _ => self.messages.push(json!({"type": "ai", "content": delta})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_begin_submission_pushes_human_and_sets_loading() {
        let mut stream = ChatStream::new();
        let request = stream.begin_submission("  hello  ").unwrap();

        assert_eq!(request.messages[0].content, "hello");
        assert_eq!(request.messages[0].role, "human");
        assert!(stream.is_loading);
        assert_eq!(stream.messages.len(), 1);
    }

    #[test]
    fn test_begin_submission_rejects_blank_text() {
        let mut stream = ChatStream::new();
        assert!(stream.begin_submission("").is_none());
        assert!(stream.begin_submission("   \n\t ").is_none());
        assert!(stream.messages.is_empty());
        assert!(!stream.is_loading);
    }

    #[test]
    fn test_begin_submission_rejects_while_in_flight() {
        let mut stream = ChatStream::new();
        assert!(stream.begin_submission("first").is_some());
        assert!(stream.begin_submission("second").is_none());
        assert_eq!(stream.messages.len(), 1);
    }

    #[test]
    fn test_begin_submission_clears_previous_error() {
        let mut stream = ChatStream::new();
        stream.apply(StreamUpdate::Error("boom".to_string()));
        assert!(stream.begin_submission("retry").is_some());
        assert!(stream.error.is_none());
    }

    #[test]
    fn test_snapshot_replaces_sequence() {
        let mut stream = ChatStream::new();
        stream.begin_submission("hi");
        stream.apply(StreamUpdate::Snapshot(vec![
            json!({"type": "human", "id": "m1", "content": "hi"}),
            json!({"type": "ai", "id": "m2", "content": "hello"}),
        ]));
        assert_eq!(stream.messages.len(), 2);
    }

    #[test]
    fn test_message_merges_by_id() {
        let mut stream = ChatStream::new();
        stream.apply(StreamUpdate::Message(
            json!({"type": "ai", "id": "m1", "content": "partial"}),
        ));
        stream.apply(StreamUpdate::Message(
            json!({"type": "ai", "id": "m1", "content": "complete"}),
        ));
        stream.apply(StreamUpdate::Message(
            json!({"type": "ai", "id": "m2", "content": "next"}),
        ));

        assert_eq!(stream.messages.len(), 2);
        assert_eq!(stream.messages[0]["content"], "complete");
    }

    #[test]
    fn test_text_delta_accumulates_on_trailing_ai() {
        let mut stream = ChatStream::new();
        stream.apply(StreamUpdate::Message(json!({"type": "ai", "id": "m1", "content": "Hel"})));
        stream.apply(StreamUpdate::TextDelta("lo".to_string()));
        stream.apply(StreamUpdate::TextDelta(" there".to_string()));
        assert_eq!(stream.messages[0]["content"], "Hello there");
    }

    #[test]
    fn test_text_delta_opens_ai_turn_when_absent() {
        let mut stream = ChatStream::new();
        stream.begin_submission("hi");
        stream.apply(StreamUpdate::TextDelta("Hey".to_string()));

        assert_eq!(stream.messages.len(), 2);
        assert_eq!(stream.messages[1]["type"], "ai");
        assert_eq!(stream.messages[1]["content"], "Hey");
    }

    #[test]
    fn test_text_delta_on_second_turn_starts_fresh_message() {
        let mut stream = ChatStream::new();
        stream.apply(StreamUpdate::Snapshot(vec![
            json!({"type": "human", "id": "a0", "content": "hi"}),
            json!({"type": "ai", "id": "a1", "content": "hello"}),
        ]));

        stream.begin_submission("next question");
        stream.apply(StreamUpdate::TextDelta("Sure".to_string()));

        // The finished turn is untouched; the delta opens a new AI message
        // after the new human message
        assert_eq!(stream.messages.len(), 4);
        assert_eq!(stream.messages[1]["content"], "hello");
        assert_eq!(stream.messages[3]["type"], "ai");
        assert_eq!(stream.messages[3]["content"], "Sure");
    }

    #[test]
    fn test_done_and_error_clear_loading() {
        let mut stream = ChatStream::new();
        stream.begin_submission("hi");
        stream.apply(StreamUpdate::Done);
        assert!(!stream.is_loading);

        stream.apply(StreamUpdate::Error("backend down".to_string()));
        assert_eq!(stream.error.as_deref(), Some("backend down"));
    }

    #[test]
    fn test_error_does_not_clear_messages() {
        let mut stream = ChatStream::new();
        stream.begin_submission("hi");
        stream.apply(StreamUpdate::TextDelta("partial answer".to_string()));
        stream.apply(StreamUpdate::Error("connection reset".to_string()));

        let view = stream.view();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_view_reflects_loading_cursor_placement() {
        let mut stream = ChatStream::new();
        stream.begin_submission("hi");
        let view = stream.view();
        assert_eq!(view.cursor_index(), Some(0));
    }
}

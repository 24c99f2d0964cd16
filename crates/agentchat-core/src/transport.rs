use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::stream::StreamUpdate;

/// One message in the submission payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutgoingMessage {
    pub role: String,
    pub content: String,
}

/// Payload for one chat submission. The API key is merged in at send time so
/// request construction stays free of credentials.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub messages: Vec<OutgoingMessage>,
}

impl SubmitRequest {
    pub fn human(text: &str) -> Self {
        Self {
            messages: vec![OutgoingMessage {
                role: "human".to_string(),
                content: text.to_string(),
            }],
        }
    }

    fn into_body(self, api_key: &str) -> Value {
        json!({
            "messages": self.messages,
            "apiKey": api_key,
        })
    }
}

/// Incremental parser for the newline-delimited JSON chunk stream.
///
/// Network reads split chunks at arbitrary byte boundaries, so partial lines
/// stay buffered until their terminating newline arrives.
#[derive(Debug, Default)]
pub struct ChunkStreamParser {
    buffer: String,
}

impl ChunkStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete updates.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamUpdate> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut updates = Vec::new();

        while let Some(split) = self.buffer.find('\n') {
            let line = self.buffer[..split].trim().to_string();
            self.buffer.drain(0..split + 1);

            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(&line) {
                Ok(chunk) => {
                    if let Some(update) = map_chunk(chunk) {
                        updates.push(update);
                    }
                }
                Err(e) => {
                    warn!("Failed to parse chunk: {} - line: {}", e, line);
                }
            }
        }

        updates
    }

    /// Flush whatever is left in the buffer as a final line. Called once the
    /// byte stream ends, for producers that omit the trailing newline.
    pub fn finish(&mut self) -> Option<StreamUpdate> {
        let line = std::mem::take(&mut self.buffer);
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        serde_json::from_str::<Value>(line).ok().and_then(map_chunk)
    }
}

fn map_chunk(chunk: Value) -> Option<StreamUpdate> {
    let chunk_type = chunk.get("type")?.as_str()?;

    match chunk_type {
        "messages" => {
            let messages = chunk
                .get("messages")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            Some(StreamUpdate::Snapshot(messages))
        }
        "message" => chunk.get("message").cloned().map(StreamUpdate::Message),
        "text-delta" => {
            let delta = chunk.get("delta").and_then(|v| v.as_str()).unwrap_or("");
            Some(StreamUpdate::TextDelta(delta.to_string()))
        }
        "done" => Some(StreamUpdate::Done),
        "error" => {
            let message = chunk
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("stream error")
                .to_string();
            Some(StreamUpdate::Error(message))
        }
        other => {
            debug!("Ignoring unrecognized chunk type: {}", other);
            None
        }
    }
}

/// HTTP client for the agent backend. Posts one submission and forwards the
/// resulting chunk stream through the provided channel.
pub struct AgentClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl AgentClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Run one submission, sending updates through the provided channel.
    /// Transport failures become a terminal [`StreamUpdate::Error`] so the
    /// receiving side always observes the end of the turn.
    pub async fn run(self, request: SubmitRequest, update_tx: mpsc::Sender<StreamUpdate>) {
        if let Err(e) = self.stream(request, &update_tx).await {
            let _ = update_tx.send(StreamUpdate::Error(e.to_string())).await;
        }
    }

    async fn stream(
        &self,
        request: SubmitRequest,
        update_tx: &mpsc::Sender<StreamUpdate>,
    ) -> Result<(), TransportError> {
        if self.api_key.trim().is_empty() {
            return Err(TransportError::MissingApiKey);
        }

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request.into_body(&self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::endpoint(status, &body));
        }

        let mut bytes = response.bytes_stream();
        let mut parser = ChunkStreamParser::default();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for update in parser.feed(&chunk) {
                if update_tx.send(update).await.is_err() {
                    warn!("Update receiver dropped");
                    return Ok(());
                }
            }
        }

        if let Some(update) = parser.finish() {
            let _ = update_tx.send(update).await;
        }

        debug!("Chunk stream ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_body_merges_api_key() {
        let body = SubmitRequest::human("hello").into_body("sk-test");
        assert_eq!(body["apiKey"], "sk-test");
        assert_eq!(body["messages"][0]["role"], "human");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_parser_handles_split_lines() {
        let mut parser = ChunkStreamParser::default();

        let first = parser.feed(b"{\"type\":\"text-delta\",\"del");
        assert!(first.is_empty());

        let second = parser.feed(b"ta\":\"Hi\"}\n{\"type\":\"done\"}\n");
        assert_eq!(
            second,
            vec![StreamUpdate::TextDelta("Hi".to_string()), StreamUpdate::Done]
        );
    }

    #[test]
    fn test_parser_skips_malformed_lines() {
        let mut parser = ChunkStreamParser::default();
        let updates = parser.feed(b"not json\n{\"type\":\"done\"}\n");
        assert_eq!(updates, vec![StreamUpdate::Done]);
    }

    #[test]
    fn test_parser_finish_flushes_unterminated_line() {
        let mut parser = ChunkStreamParser::default();
        assert!(parser.feed(b"{\"type\":\"done\"}").is_empty());
        assert_eq!(parser.finish(), Some(StreamUpdate::Done));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_map_chunk_snapshot() {
        let chunk = json!({
            "type": "messages",
            "messages": [
                {"type": "human", "content": "hi"},
                {"type": "ai", "content": "hello"},
            ],
        });
        match map_chunk(chunk) {
            Some(StreamUpdate::Snapshot(messages)) => assert_eq!(messages.len(), 2),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_map_chunk_message_and_error() {
        let message = json!({"type": "message", "message": {"type": "ai", "content": "ok"}});
        assert!(matches!(map_chunk(message), Some(StreamUpdate::Message(_))));

        let error = json!({"type": "error", "error": "model unavailable"});
        assert_eq!(
            map_chunk(error),
            Some(StreamUpdate::Error("model unavailable".to_string()))
        );
    }

    #[test]
    fn test_map_chunk_ignores_unknown_types() {
        assert_eq!(map_chunk(json!({"type": "heartbeat"})), None);
        assert_eq!(map_chunk(json!({"no_type": true})), None);
    }
}

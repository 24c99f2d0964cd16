use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("HTTP {status}: {message}")]
    Endpoint { status: StatusCode, message: String },

    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl TransportError {
    /// Build an endpoint error from a non-success response body. The backend
    /// reports failures as `{"error": "..."}`; anything else falls back to
    /// the raw body or the status line.
    pub fn endpoint(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    body.to_string()
                }
            });

        Self::Endpoint { status, message }
    }
}

pub mod classify;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod stream;
pub mod transport;

pub use classify::{classify_role, extract_text, Role};
pub use config::Config;
pub use error::TransportError;
pub use reconcile::{reconcile, ChatItem, ChatView, ToolCall, ToolCallState, ToolResult};
pub use stream::{ChatStream, StreamUpdate};
pub use transport::{AgentClient, OutgoingMessage, SubmitRequest};

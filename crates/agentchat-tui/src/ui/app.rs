use agentchat_core::{AgentClient, ChatStream, Config, StreamUpdate};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    ApiKey,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    pub running: bool,
    pub view: View,
    pub input_mode: InputMode,
    pub input: String,
    pub cursor_position: usize,

    pub scroll_offset: usize,
    /// Maximum scroll offset (set after rendering to enable proper scroll clamping)
    pub max_scroll_offset: usize,
    pub status_message: Option<String>,

    pub stream: ChatStream,
    pub endpoint: String,
    pub api_key: Option<String>,

    update_tx: Sender<StreamUpdate>,
    update_rx: Option<Receiver<StreamUpdate>>,
}

impl App {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        let (update_tx, update_rx) = mpsc::channel(256);
        let view = if api_key.is_some() {
            View::Chat
        } else {
            View::ApiKey
        };

        Self {
            running: true,
            view,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor_position: 0,
            scroll_offset: usize::MAX,
            max_scroll_offset: 0,
            status_message: None,
            stream: ChatStream::new(),
            endpoint,
            api_key,
            update_tx,
            update_rx: Some(update_rx),
        }
    }

    /// Take the update receiver for the event loop. Can only be taken once.
    pub fn take_update_rx(&mut self) -> Option<Receiver<StreamUpdate>> {
        self.update_rx.take()
    }

    pub fn apply_update(&mut self, update: StreamUpdate) {
        // Follow the stream unless the user has scrolled up
        if self.scroll_offset >= self.max_scroll_offset {
            self.scroll_offset = usize::MAX;
        }
        self.stream.apply(update);
    }

    /// Submit the current input as a chat message. No-op when the input is
    /// blank or a turn is already streaming.
    pub fn submit_message(&mut self) {
        let Some(api_key) = self.api_key.clone() else {
            self.set_status("Set an API key first");
            self.view = View::ApiKey;
            return;
        };

        if let Some(request) = self.stream.begin_submission(&self.input) {
            self.clear_input();
            self.clear_status();
            self.scroll_offset = usize::MAX;

            let client = AgentClient::new(self.endpoint.clone(), api_key);
            let update_tx = self.update_tx.clone();
            tokio::spawn(client.run(request, update_tx));
        }
    }

    /// Persist the entered API key and move to the chat view.
    pub fn save_api_key(&mut self) {
        let key = self.input.trim().to_string();
        if key.is_empty() {
            self.set_status("API key cannot be empty");
            return;
        }

        let config = Config {
            endpoint: Some(self.endpoint.clone()),
            api_key: Some(key.clone()),
        };
        if let Err(e) = config.save() {
            self.set_status(&format!("Failed to save config: {e}"));
        } else {
            info!("API key saved");
        }

        self.api_key = Some(key);
        self.clear_input();
        self.view = View::Chat;
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Scroll up by the given amount, clamping to valid range
    pub fn scroll_up(&mut self, amount: usize) {
        // First clamp scroll_offset to max if it's above (handles usize::MAX sentinel)
        if self.scroll_offset > self.max_scroll_offset {
            self.scroll_offset = self.max_scroll_offset;
        }
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    /// Scroll down by the given amount, clamping to valid range
    pub fn scroll_down(&mut self, amount: usize) {
        if self.scroll_offset > self.max_scroll_offset {
            self.scroll_offset = self.max_scroll_offset;
        }
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(amount)
            .min(self.max_scroll_offset);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = usize::MAX;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn move_cursor_left(&mut self) {
        if let Some(prev) = self.input[..self.cursor_position].chars().next_back() {
            self.cursor_position -= prev.len_utf8();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if let Some(next) = self.input[self.cursor_position..].chars().next() {
            self.cursor_position += next.len_utf8();
        }
    }

    pub fn enter_char(&mut self, c: char) {
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 && !self.input.is_empty() {
            let prev = self.input[..self.cursor_position]
                .chars()
                .next_back()
                .map(char::len_utf8)
                .unwrap_or(1);
            self.cursor_position -= prev;
            self.input.remove(self.cursor_position);
        }
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        App::new("http://localhost:8000/api/chat".to_string(), Some("sk-test".to_string()))
    }

    #[tokio::test]
    async fn test_submit_clears_input_on_acceptance() {
        let mut app = test_app();
        app.input = "hello".to_string();
        app.cursor_position = 5;
        app.submit_message();

        assert!(app.input.is_empty());
        assert!(app.stream.is_loading);
    }

    #[tokio::test]
    async fn test_submit_keeps_input_while_streaming() {
        let mut app = test_app();
        app.input = "first".to_string();
        app.submit_message();

        app.input = "second".to_string();
        app.submit_message();
        assert_eq!(app.input, "second");
        assert_eq!(app.stream.messages.len(), 1);
    }

    #[test]
    fn test_missing_api_key_routes_to_key_view() {
        let mut app = App::new("http://localhost:8000/api/chat".to_string(), None);
        assert_eq!(app.view, View::ApiKey);

        app.view = View::Chat;
        app.input = "hello".to_string();
        app.submit_message();
        assert_eq!(app.view, View::ApiKey);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_scroll_clamps_sentinel() {
        let mut app = test_app();
        app.max_scroll_offset = 10;
        app.scroll_up(3);
        assert_eq!(app.scroll_offset, 7);

        app.scroll_down(100);
        assert_eq!(app.scroll_offset, 10);
    }

    #[test]
    fn test_cursor_editing_handles_multibyte() {
        let mut app = test_app();
        app.enter_char('é');
        app.enter_char('x');
        app.delete_char();
        app.delete_char();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor_position, 0);
    }

    #[test]
    fn test_cursor_moves_by_whole_chars() {
        let mut app = test_app();
        app.enter_char('é');
        app.move_cursor_left();
        app.enter_char('x');
        assert_eq!(app.input, "xé");

        app.move_cursor_right();
        app.enter_char('y');
        assert_eq!(app.input, "xéy");

        app.delete_char();
        app.delete_char();
        app.delete_char();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor_position, 0);

        // Movement at the boundaries is a no-op
        app.move_cursor_left();
        app.move_cursor_right();
        assert_eq!(app.cursor_position, 0);
    }
}

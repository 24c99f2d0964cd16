mod tracing_setup;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use agentchat_core::config::{Config, DEFAULT_ENDPOINT};
use anyhow::{anyhow, Result};
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use futures::StreamExt;
use ratatui::Frame;
use tracing::info;

use ui::views::api_key::render_api_key;
use ui::views::chat::render_chat;
use ui::{App, InputMode, Tui, View};

#[derive(Debug, Parser)]
#[command(name = "agentchat", about = "Terminal chat client for a streaming agent backend")]
struct Args {
    /// Chat endpoint URL (defaults to config, then the local server)
    #[arg(long)]
    endpoint: Option<String>,

    /// API key for the model provider (defaults to config)
    #[arg(long)]
    api_key: Option<String>,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_setup::init_tracing(args.log_file.as_deref())?;

    // Set up panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture,
            crossterm::event::DisableBracketedPaste
        );
        original_hook(panic_info);
    }));

    let config = Config::load();
    let endpoint = args
        .endpoint
        .or_else(|| std::env::var("AGENTCHAT_ENDPOINT").ok())
        .or(config.endpoint)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let api_key = args
        .api_key
        .or_else(|| std::env::var("AGENTCHAT_API_KEY").ok())
        .or(config.api_key);

    info!(endpoint, "starting agentchat");

    let mut app = App::new(endpoint, api_key);
    let mut terminal = ui::init_terminal()?;

    let result = run_app(&mut terminal, &mut app).await;

    ui::restore_terminal()?;

    if let Err(err) = result {
        eprintln!("Error: {err}");
    }

    Ok(())
}

async fn run_app(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(50));
    let mut update_rx = app
        .take_update_rx()
        .ok_or_else(|| anyhow!("update receiver already taken"))?;

    while app.running {
        terminal.draw(|f| render(f, app))?;

        tokio::select! {
            maybe_event = event_stream.next() => {
                if let Some(Ok(event)) = maybe_event {
                    match event {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            handle_key(app, key);
                        }
                        Event::Mouse(mouse) if app.view == View::Chat => {
                            match mouse.kind {
                                MouseEventKind::ScrollUp => app.scroll_up(3),
                                MouseEventKind::ScrollDown => app.scroll_down(3),
                                _ => {}
                            }
                        }
                        Event::Paste(text) if app.input_mode == InputMode::Editing => {
                            for c in text.chars() {
                                app.enter_char(c);
                            }
                        }
                        _ => {}
                    }
                }
            }

            Some(update) = update_rx.recv() => {
                app.apply_update(update);
                // Drain whatever else queued up before the next redraw
                while let Ok(update) = update_rx.try_recv() {
                    app.apply_update(update);
                }
            }

            // Keep redrawing while streams animate the cursor
            _ = tick_interval.tick() => {}
        }
    }

    Ok(())
}

fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    match app.view {
        View::ApiKey => render_api_key(f, app, area),
        View::Chat => render_chat(f, app, area),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.view {
        View::ApiKey => handle_api_key_input(app, key),
        View::Chat => match app.input_mode {
            InputMode::Editing => handle_chat_editing(app, key),
            InputMode::Normal => handle_chat_normal(app, key),
        },
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.save_api_key(),
        KeyCode::Esc => app.quit(),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Char(c) => app.enter_char(c),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_message(),
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => app.enter_char(c),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('i') | KeyCode::Char('e') => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('G') => app.scroll_to_bottom(),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::PageDown => app.scroll_down(10),
        _ => {}
    }
}

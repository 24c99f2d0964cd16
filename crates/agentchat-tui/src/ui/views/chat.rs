use agentchat_core::{ChatItem, ChatView, Role, ToolCallState};
use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::ui::{App, InputMode};

const HUMAN_COLOR: Color = Color::Rgb(86, 156, 214);
const AGENT_COLOR: Color = Color::Rgb(152, 195, 121);
const PENDING_COLOR: Color = Color::Rgb(220, 220, 170);
const ERROR_COLOR: Color = Color::Rgb(244, 112, 112);

pub fn render_chat(f: &mut Frame, app: &mut App, area: Rect) {
    let view = app.stream.view();
    let has_status = app.status_message.is_some();

    let chunks = if has_status {
        Layout::vertical([
            Constraint::Min(0),    // Messages
            Constraint::Length(1), // Status line
            Constraint::Length(3), // Input
            Constraint::Length(1), // Help line
        ])
        .split(area)
    } else {
        Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area)
    };

    render_messages(f, app, &view, chunks[0]);

    if has_status {
        render_status(f, app, chunks[1]);
    }

    let input_area = chunks[if has_status { 2 } else { 1 }];
    render_input(f, app, &view, input_area);

    let help_area = chunks[if has_status { 3 } else { 2 }];
    render_help(f, app, help_area);
}

fn render_messages(f: &mut Frame, app: &mut App, view: &ChatView, area: Rect) {
    // Horizontal padding around the message column
    let h_padding: u16 = 2;
    let area = Rect {
        x: area.x + h_padding,
        y: area.y,
        width: area.width.saturating_sub(h_padding * 2),
        height: area.height,
    };

    let mut lines: Vec<Line> = Vec::new();
    let cursor_index = view.cursor_index();
    let last_index = view.items.len().checked_sub(1);

    for (index, item) in view.items.iter().enumerate() {
        if item.role == Role::Ai && item.is_blank() && cursor_index != Some(index) {
            continue;
        }

        push_item_lines(&mut lines, item, cursor_index == Some(index));

        if last_index == Some(index) && view.error_on_last_item() {
            if let Some(ref error) = view.error {
                lines.push(Line::from(vec![
                    Span::styled("│ ", Style::default().fg(AGENT_COLOR)),
                    Span::styled(
                        format!("✗ {error}"),
                        Style::default().fg(ERROR_COLOR),
                    ),
                ]));
            }
        }

        lines.push(Line::default());
    }

    // A turn that hasn't produced any renderable item yet
    if view.is_loading && cursor_index.is_none() {
        lines.push(Line::from(Span::styled(
            "▌",
            Style::default().fg(AGENT_COLOR),
        )));
        lines.push(Line::default());
    }

    if view.error.is_some() && !view.error_on_last_item() {
        if let Some(ref error) = view.error {
            lines.push(Line::from(Span::styled(
                format!("✗ {error}"),
                Style::default().fg(ERROR_COLOR),
            )));
        }
    }

    // Clamp scroll against the rendered line count; usize::MAX pins to bottom
    let height = area.height as usize;
    app.max_scroll_offset = lines.len().saturating_sub(height);
    if app.scroll_offset > app.max_scroll_offset {
        app.scroll_offset = app.max_scroll_offset;
    }

    let visible: Vec<Line> = lines
        .into_iter()
        .skip(app.scroll_offset)
        .take(height)
        .collect();

    f.render_widget(Paragraph::new(visible).wrap(Wrap { trim: false }), area);
}

fn push_item_lines(lines: &mut Vec<Line>, item: &ChatItem, has_cursor: bool) {
    let (author, color) = match item.role {
        Role::Human => ("You", HUMAN_COLOR),
        _ => ("Agent", AGENT_COLOR),
    };

    lines.push(Line::from(vec![
        Span::styled("│ ", Style::default().fg(color)),
        Span::styled(
            author,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ]));

    let mut text_lines: Vec<String> = item.text.lines().map(str::to_string).collect();
    if has_cursor {
        match text_lines.last_mut() {
            Some(last) => last.push('▌'),
            None => text_lines.push("▌".to_string()),
        }
    }

    for text_line in text_lines {
        lines.push(Line::from(vec![
            Span::styled("│ ", Style::default().fg(color)),
            Span::raw(text_line),
        ]));
    }

    for state in &item.tool_calls {
        lines.push(tool_call_line(state, color));
    }
}

fn tool_call_line(state: &ToolCallState, indicator: Color) -> Line<'static> {
    let name = if state.call.name.is_empty() {
        "tool"
    } else {
        state.call.name.as_str()
    };

    if let Some(ref result) = state.result {
        Line::from(vec![
            Span::styled("│ ", Style::default().fg(indicator)),
            Span::styled("✓ ", Style::default().fg(AGENT_COLOR)),
            Span::styled(name.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!(" → {}", preview(&result.text)),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("│ ", Style::default().fg(indicator)),
            Span::styled("⚙ ", Style::default().fg(PENDING_COLOR)),
            Span::styled(name.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" …", Style::default().fg(Color::DarkGray)),
        ])
    }
}

/// First line of a tool result, truncated for the one-line summary.
fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    let mut out: String = first.chars().take(60).collect();
    if first.chars().count() > 60 {
        out.push('…');
    }
    out
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    if let Some(ref status) = app.status_message {
        f.render_widget(
            Paragraph::new(status.as_str()).style(Style::default().fg(PENDING_COLOR)),
            area,
        );
    }
}

fn render_input(f: &mut Frame, app: &App, view: &ChatView, area: Rect) {
    let title = if view.is_loading {
        " Message (waiting for agent) "
    } else {
        " Message "
    };

    let border_style = match app.input_mode {
        InputMode::Editing => Style::default().fg(HUMAN_COLOR),
        InputMode::Normal => Style::default().fg(Color::DarkGray),
    };

    let input = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(border_style);
    f.render_widget(input, area);

    if app.input_mode == InputMode::Editing {
        // cursor_position is a byte offset; the terminal column is in chars
        let column = app.input[..app.cursor_position].chars().count() as u16;
        f.set_cursor_position(Position::new(area.x + column + 1, area.y + 1));
    }
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.input_mode {
        InputMode::Editing => "Enter send · Esc normal mode",
        InputMode::Normal => "i edit · j/k scroll · G bottom · q quit",
    };
    f.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

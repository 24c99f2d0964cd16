use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::App;

pub fn render_api_key(f: &mut Frame, app: &App, area: Rect) {
    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(7),
        Constraint::Fill(2),
    ])
    .split(area);
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(60),
        Constraint::Fill(1),
    ])
    .split(vertical[1]);
    let modal = horizontal[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" API Key ")
        .style(Style::default().fg(Color::Rgb(86, 156, 214)));
    let inner = block.inner(modal);
    f.render_widget(block, modal);

    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(inner);

    f.render_widget(
        Paragraph::new("Enter your API key to start chatting."),
        rows[0],
    );

    // Never echo the key itself
    let masked = "•".repeat(app.input.chars().count());
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(masked),
        ])),
        rows[2],
    );

    if let Some(ref status) = app.status_message {
        f.render_widget(
            Paragraph::new(status.as_str()).style(Style::default().fg(Color::Rgb(244, 112, 112))),
            rows[4],
        );
    } else {
        f.render_widget(
            Paragraph::new("Enter save · Esc quit").style(Style::default().fg(Color::DarkGray)),
            rows[4],
        );
    }

    f.set_cursor_position(Position::new(
        rows[2].x + 2 + app.input.chars().count() as u16,
        rows[2].y,
    ));
}

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs},
    Frame,
};

use crate::calendar::{weekday_index, WEEKDAY_LABELS};
use crate::models::TAG_PALETTE;
use crate::reminders::Notifier;
use crate::storage::BlobStore;
use super::app::{App, InputMode};

/// Terminal color of a tag palette index.
pub fn tag_color(index: usize) -> Color {
    match TAG_PALETTE.get(index) {
        Some(&(r, g, b)) => Color::Rgb(r, g, b),
        None => Color::Reset,
    }
}

pub fn ui<S: BlobStore, N: Notifier>(f: &mut Frame, app: &mut App<S, N>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Date strip
            Constraint::Min(0),    // Agenda
            Constraint::Length(3)  // Help
        ].as_ref())
        .split(f.area());

    let titles: Vec<Line> = app
        .dates
        .iter()
        .map(|d| Line::from(format!("{} {}", WEEKDAY_LABELS[weekday_index(*d) as usize], d.format("%m/%d"))))
        .collect();
    let strip = Tabs::new(titles)
        .select(app.selected_date)
        .block(Block::default().borders(Borders::ALL).title("Remindust"))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(strip, chunks[0]);

    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|r| {
            let style = if r.done {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };
            let tag = match &r.tag {
                Some(t) => Cell::from(t.name.clone())
                    .style(Style::default().fg(tag_color(t.color_index))),
                None => Cell::from(""),
            };
            Row::new(vec![
                Cell::from(if r.done { "[x]" } else { "[ ]" }),
                Cell::from(r.task.anchor.format("%H:%M").to_string()),
                Cell::from(r.task.title.clone()),
                tag,
                Cell::from(r.task.recurrence.to_string()),
            ]).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(24),
    ];

    let title = format!("{} - {} task(s)", app.selected_day(), app.rows.len());
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "Time", "Title", "Tag", "Repeat"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[1], &mut app.state);

    let help_text = match (&app.input_mode, &app.message) {
        (InputMode::Normal, Some(msg)) => msg.clone(),
        (InputMode::Normal, None) => "q: Quit | ←/→: Day | ↑/↓: Select | Space: Done | a: Add | d: Del".to_string(),
        (InputMode::Adding, Some(msg)) => format!("{} | Enter: Next Step | Esc: Cancel", msg),
        (InputMode::Adding, None) => "Enter: Next Step | Esc: Cancel".to_string(),
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    // Render Input Box if needed
    if app.input_mode == InputMode::Adding {
        let area = centered_rect(60, 3, f.area()); // Fixed height of 3 (border + 1 line)
        f.render_widget(Clear, area); // Clear the area first

        let title = match app.add_state.step {
            0 => "Add Task: Enter Title",
            1 => "Add Task: Enter Time (HH:MM, default 09:00)",
            2 => "Add Task: Repeat (none, next-week, weekly, monthly, yearly)",
            _ => "Add Task",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}

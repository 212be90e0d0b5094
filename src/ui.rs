use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, ConnectivityStatus, Sender};

/// Non-empty lines of a message body; each becomes its own rendered block.
fn content_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter(|line| !line.trim().is_empty())
}

/// Input box height: grows with the text, capped at a third of the terminal.
fn input_area_height(input: &str, total_height: u16) -> u16 {
    let lines = input.split('\n').count() as u16;
    let max = (total_height / 3).max(3);
    (lines + 2).clamp(3, max)
}

/// (row, col) of the cursor within the input buffer, in chars.
fn cursor_position(input: &str, cursor: usize) -> (usize, usize) {
    let mut row = 0;
    let mut col = 0;
    for (i, c) in input.chars().enumerate() {
        if i == cursor {
            break;
        }
        if c == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (row, col)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_area_height(&app.input, area.height)),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let [title_area, status_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(18)]).areas(area);

    let model_indicator = match &app.model_type {
        Some(model) => format!(" [{}]", model),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(model_indicator, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, title_area);

    let status_color = match app.status {
        ConnectivityStatus::Online => Color::Green,
        ConnectivityStatus::Offline => Color::Red,
        ConnectivityStatus::Thinking => Color::Yellow,
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled("● ", Style::default().fg(status_color)),
        Span::styled(format!("{} ", status_label(app)), Style::default().fg(Color::White)),
    ]))
    .alignment(Alignment::Right)
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, status_area);
}

fn status_label(app: &App) -> String {
    if app.status == ConnectivityStatus::Thinking && app.thinking_dots_active() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!("{}{}", app.status.label(), dots)
    } else {
        app.status.label().to_string()
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store inner dimensions for the auto-scroll wrap calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let chat_text = if app.messages.is_empty() && !app.is_waiting() {
        Text::from(Span::styled(
            "Type a message to start chatting...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.messages {
            match msg.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in content_lines(&msg.content) {
                        lines.push(Line::from(line));
                    }
                }
                Sender::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in content_lines(&msg.content) {
                        lines.push(Line::from(line));
                    }
                }
                Sender::System => {
                    lines.push(Line::from(Span::styled(
                        "System:",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )));
                    for line in content_lines(&msg.content) {
                        lines.push(Line::from(Span::styled(
                            line,
                            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                        )));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.is_waiting() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                thinking_indicator(app),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn thinking_indicator(app: &App) -> String {
    if app.thinking_dots_active() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!("Thinking{}", dots)
    } else {
        "Thinking".to_string()
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();

    let (border_color, title) = if enabled {
        (Color::Yellow, " Message (Enter to send, Shift+Enter for newline) ")
    } else {
        (Color::DarkGray, " Message (waiting for reply) ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (cursor_row, cursor_col) = cursor_position(&app.input, app.input_cursor);

    // Horizontal scroll keeps the cursor column visible
    let col_offset = if inner_width == 0 {
        0
    } else if cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };
    // Vertical scroll keeps the cursor row visible
    let row_offset = if inner_height == 0 {
        0
    } else if cursor_row >= inner_height {
        cursor_row - inner_height + 1
    } else {
        0
    };

    let visible_text = app
        .input
        .split('\n')
        .map(|line| line.chars().skip(col_offset).take(inner_width).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .scroll((row_offset as u16, 0))
        .block(input_block);

    frame.render_widget(input, area);

    if enabled {
        frame.set_cursor_position((
            area.x + (cursor_col - col_offset) as u16 + 1,
            area.y + (cursor_row - row_offset) as u16 + 1,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.input_enabled() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
        ]
    } else {
        vec![
            Span::styled(" ... ", key_style),
            Span::styled(" waiting ", label_style),
        ]
    };

    hints.extend(vec![
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_lines_skip_empty_and_whitespace_lines() {
        let lines: Vec<&str> = content_lines("one\n\n  \ntwo\n").collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn content_lines_of_a_single_line() {
        let lines: Vec<&str> = content_lines("hello").collect();
        assert_eq!(lines, vec!["hello"]);
    }

    #[test]
    fn input_height_grows_with_newlines() {
        assert_eq!(input_area_height("", 30), 3);
        assert_eq!(input_area_height("one line", 30), 3);
        assert_eq!(input_area_height("a\nb", 30), 4);
        assert_eq!(input_area_height("a\nb\nc", 30), 5);
    }

    #[test]
    fn input_height_is_capped() {
        let tall = "x\n".repeat(40);
        assert_eq!(input_area_height(&tall, 30), 10);
        // Tiny terminals still get the minimum box
        assert_eq!(input_area_height(&tall, 6), 3);
    }

    #[test]
    fn cursor_position_tracks_rows_and_cols() {
        assert_eq!(cursor_position("hello", 3), (0, 3));
        assert_eq!(cursor_position("one\ntwo", 4), (1, 0));
        assert_eq!(cursor_position("one\ntwo", 6), (1, 2));
        assert_eq!(cursor_position("one\ntwo", 7), (1, 3));
    }

    #[test]
    fn cursor_position_at_empty_input() {
        assert_eq!(cursor_position("", 0), (0, 0));
    }
}

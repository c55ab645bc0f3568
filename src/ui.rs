use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use crate::app::{App, Focus};
use crate::conversation::Role;
use crate::view::{self, ViewModel};

/// Width of the send button, borders included
const SEND_BUTTON_WIDTH: u16 = 10;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let model = view::build(&app.conversation, app.is_loading(), &app.markdown);

    // Main layout: header, chat, input row, footer
    let [header_area, chat_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SEND_BUTTON_WIDTH),
    ])
    .areas(input_row);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.input_area = Some(input_area);
    app.send_area = Some(send_area);

    render_header(app, frame, header_area);
    render_chat(app, &model, frame, chat_area);
    render_input(app, &model, frame, input_area);
    render_send_button(app, &model, frame, send_area);
    render_footer(&model, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" chatbox ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Flatten the bubbles into display lines
fn chat_lines(model: &ViewModel, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for bubble in &model.bubbles {
        match bubble.role {
            Role::User => {
                lines.push(
                    Line::from(Span::styled(
                        "You",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ))
                    .alignment(Alignment::Right),
                );
                for line in &bubble.body.lines {
                    lines.push(
                        line.clone()
                            .style(Style::default().fg(Color::Cyan))
                            .alignment(Alignment::Right),
                    );
                }
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistant",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                lines.extend(bubble.body.lines.iter().cloned());
            }
        }
        lines.push(Line::default());
    }

    if model.typing {
        // Animated dots: cycles through "•", "••", "•••"
        let dots = "•".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            dots,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )));
    }

    lines
}

fn render_chat(app: &mut App, model: &ViewModel, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let chat = Paragraph::new(Text::from(chat_lines(model, app.animation_frame)))
        .wrap(Wrap { trim: false });
    // Measured before the block is attached, so only the wrapped text counts
    let total = chat.line_count(inner_width).min(u16::MAX as usize) as u16;

    app.max_chat_scroll = total.saturating_sub(inner_height);
    if app.follow_tail {
        app.chat_scroll = app.max_chat_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_chat_scroll);
    }

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if app.max_chat_scroll > 0 {
        let mut state = ScrollbarState::new(app.max_chat_scroll as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn render_input(app: &App, model: &ViewModel, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Input && model.input_enabled;
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new(model.placeholder).style(Style::default().fg(Color::DarkGray))
    } else {
        let visible_text: String = app.input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let color = if model.input_enabled { Color::Cyan } else { Color::DarkGray };
        Paragraph::new(visible_text).style(Style::default().fg(color))
    };

    frame.render_widget(input.block(input_block), area);

    if focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_send_button(app: &App, model: &ViewModel, frame: &mut Frame, area: Rect) {
    let style = if !model.send_enabled {
        Style::default().fg(Color::DarkGray)
    } else if app.focus == Focus::Send {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let button = Paragraph::new(model.send_label)
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL).border_style(style));
    frame.render_widget(button, area);
}

fn render_footer(model: &ViewModel, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if model.typing {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" READY ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::App;
use crate::message::ChatRole;
use crate::store::ConversationStore;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.toast.is_some() {
        render_toast(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" ☀ ☁ ☂ ", Style::default().fg(Color::Yellow)),
        Span::styled("Weather Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            "Get instant weather updates for any location ",
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);

    // Endpoint on the right, when there is room
    let endpoint = format!(" {} ", app.endpoint);
    let width = u16::try_from(endpoint.chars().count()).unwrap_or(u16::MAX);
    if area.width > width.saturating_add(80) {
        let right = Rect {
            x: area.x + area.width - width,
            width,
            ..area
        };
        frame.render_widget(
            Paragraph::new(endpoint).style(Style::default().bg(Color::DarkGray).fg(Color::Black)),
            right,
        );
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_latest {
        app.scroll_chat_to_bottom();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let chat = transcript(&app.store, app.animation_frame)
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// The transcript as drawn, without its border. `App` measures this same
/// paragraph to know how far down it can scroll.
pub fn transcript(store: &ConversationStore, animation_frame: u8) -> Paragraph<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in store.messages() {
        let time = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();
        let (label, color) = match msg.role {
            ChatRole::User => ("You", Color::Cyan),
            ChatRole::Assistant => ("Assistant", Color::Yellow),
        };

        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
        ]));
        // Replies are shown as-is, no markdown
        for line in msg.text.lines() {
            lines.push(Line::from(line.to_string()));
        }
        if msg.text.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::default());
    }

    if store.is_loading() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Checking the skies{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (border_color, title) = if app.is_loading() {
        (Color::DarkGray, " Waiting for reply... ")
    } else {
        (Color::Yellow, " Ask about the weather ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll so the cursor stays visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = if visible_text.is_empty() {
        Paragraph::new(Span::styled(
            "e.g. What's the weather in Lisbon?",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(block), area);

    let cursor_x = (app.cursor - scroll_offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(if app.toast.is_some() { " dismiss " } else { " clear " }, label_style),
        Span::styled(" Ctrl-C ", key_style),
        Span::styled(" quit ", label_style),
    ];

    if app.is_loading() {
        hints.push(Span::styled(" sending ", Style::default().bg(Color::Yellow).fg(Color::Black)));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_toast(app: &App, frame: &mut Frame, area: Rect) {
    let Some(toast) = &app.toast else {
        return;
    };

    let width = 44.min(area.width);
    let height = 4.min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y + 1,
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            format!(" {} ", toast.notification.title),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));

    let body = Paragraph::new(toast.notification.description.as_str())
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(Clear, popup);
    frame.render_widget(body, popup);
}

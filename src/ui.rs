use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, InputMode, LookupState};

const INSTRUCTIONS: &[&str] = &[
    "1. Search title in Perplexity",
    "2. Search title in DuckDuckGo",
    "3. Cross verify the results",
    "4. If the place is not accurate, you get \"I could not find the place.\"",
    "5. If the place is accurate, you get the coordinates as \"latitude, longitude\".",
];

pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Jaunt ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("find place coordinates", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_body(app: &App, frame: &mut Frame, area: Rect) {
    let [instructions_area, title_area, description_area, result_area] = Layout::vertical([
        Constraint::Length(INSTRUCTIONS.len() as u16 + 2),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(3),
    ])
    .areas(area);

    render_instructions(frame, instructions_area);
    render_input(
        app,
        frame,
        title_area,
        "Title",
        &app.title_input,
        app.title_cursor,
        Focus::Title,
    );
    render_input(
        app,
        frame,
        description_area,
        "Description",
        &app.description_input,
        app.description_cursor,
        Focus::Description,
    );
    render_result(app, frame, result_area);
}

fn render_instructions(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = INSTRUCTIONS
        .iter()
        .map(|step| Line::from(Span::styled(*step, Style::default().fg(Color::Gray))))
        .collect();

    let instructions = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" How it works ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(instructions, area);
}

fn render_input(
    app: &App,
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    cursor: usize,
    field: Focus,
) {
    let focused = app.focus == field;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(value).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {label} "))
            .border_style(border_style),
    );
    frame.render_widget(input, area);

    // Place the terminal cursor inside the focused field while editing
    if focused && app.input_mode == InputMode::Editing {
        let offset: u16 = value
            .chars()
            .take(cursor)
            .count()
            .try_into()
            .unwrap_or(u16::MAX);
        frame.set_cursor_position((area.x + 1 + offset, area.y + 1));
    }
}

fn render_result(app: &App, frame: &mut Frame, area: Rect) {
    let (text, style, title) = match &app.lookup {
        LookupState::Idle => (
            Line::from("Enter a title and description, then press Enter."),
            Style::default().fg(Color::Gray),
            " Coordinates ",
        ),
        LookupState::Running => {
            let dots = ".".repeat(app.animation_frame as usize + 1);
            (
                Line::from(format!("Thinking{dots}")),
                Style::default().fg(Color::Yellow),
                " Coordinates ",
            )
        }
        LookupState::Done { reply } => (
            Line::from(Span::styled(
                reply.clone(),
                Style::default().fg(Color::Green).bold(),
            )),
            Style::default(),
            " Coordinates ",
        ),
        LookupState::Error { message } => (
            Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red).bold(),
            )),
            Style::default(),
            " Error ",
        ),
    };

    let result = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(result, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", Style::default().bg(Color::Blue).bold()),
        InputMode::Editing => Span::styled(" INSERT ", Style::default().bg(Color::Green).bold()),
    };

    let help = match app.input_mode {
        InputMode::Normal => " q quit | Tab switch field | i edit | Enter find coordinates",
        InputMode::Editing => " Esc normal mode | Tab switch field | Enter find coordinates",
    };

    let session = app
        .session_id
        .as_deref()
        .map(|id| format!(" session {} ", &id[..8.min(id.len())]))
        .unwrap_or_default();

    let footer = Line::from(vec![
        mode,
        Span::styled(help, Style::default().fg(Color::Gray)),
        Span::styled(session, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

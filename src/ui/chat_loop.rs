//! Full-screen chat loop.
//!
//! The loop owns the terminal and the interaction state (input buffer,
//! scroll position, search overlay); all chat semantics live in
//! [`ChatController`]. One iteration draws the frame, handles at most one
//! input event, then drains any settled request outcomes.

use std::cell::RefCell;
use std::error::Error;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::Utc;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{
            self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
            KeyModifiers, MouseEventKind,
        },
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::api::client::BankingClient;
use crate::core::chat_request::ChatRequestService;
use crate::core::message::{Message, Role};
use crate::core::notify::{Notifier, Severity};
use crate::core::routing::{self, MAIN_AGENT};
use crate::core::search::SearchState;
use crate::core::session::ChatController;
use crate::utils::color::hex_color;

const INPUT_HEIGHT: u16 = 3;
const SEARCH_HEIGHT: u16 = 3;
const HINT: &str = "Enter send · Ctrl+F search · Ctrl+E export · Ctrl+L clear · Ctrl+C quit";

/// Notices published by the controller, displayed on the status line until
/// their duration elapses. Clones share the same queue.
#[derive(Clone, Default)]
struct NoticeBoard {
    notices: Rc<RefCell<Vec<(String, Severity, Instant)>>>,
}

impl NoticeBoard {
    fn current(&self) -> Option<(String, Severity)> {
        let now = Instant::now();
        self.notices.borrow_mut().retain(|(_, _, deadline)| *deadline > now);
        self.notices
            .borrow()
            .last()
            .map(|(text, severity, _)| (text.clone(), *severity))
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, message: &str, severity: Severity, duration_ms: u64) {
        let deadline = Instant::now() + Duration::from_millis(duration_ms);
        self.notices
            .borrow_mut()
            .push((message.to_string(), severity, deadline));
    }
}

struct ChatUi {
    controller: ChatController,
    client: BankingClient,
    service: ChatRequestService,
    search: SearchState,
    notices: NoticeBoard,
    input: String,
    search_open: bool,
    scroll_offset: u16,
    auto_scroll: bool,
}

impl ChatUi {
    fn submit_input(&mut self) {
        let Some(outbound) = self.controller.submit(&self.input) else {
            // Rejected: in flight or blank. The buffer is kept so nothing
            // typed during a pending request is lost.
            return;
        };
        self.input.clear();
        self.service
            .spawn_request(self.client.clone(), "chat".to_string(), outbound);
        self.search.refresh(self.controller.messages());
        self.auto_scroll = true;
    }

    fn export_session(&mut self) {
        let artifact = self.controller.export();
        let filename = format!(
            "banking-chat-{}-{}.json",
            self.controller.session_id(),
            Utc::now().format("%Y-%m-%d")
        );
        let result = serde_json::to_string_pretty(&artifact)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&filename, json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                self.notices
                    .notify(&format!("Exported to {filename}"), Severity::Success, 4000)
            }
            Err(error) => {
                tracing::warn!(%error, "export failed");
                self.notices.notify("Export failed", Severity::Error, 4000);
            }
        }
    }

    fn clear_session(&mut self) {
        self.controller.clear();
        self.search.refresh(self.controller.messages());
        self.scroll_offset = 0;
        self.auto_scroll = true;
    }

    // The offset is clamped against the real viewport at draw time.
    fn jump_to_current_match(&mut self) {
        if let Some(index) = self.search.current() {
            let (_, starts) = build_display_lines(&self.controller, &self.search);
            if let Some(&line) = starts.get(index) {
                self.auto_scroll = false;
                self.scroll_offset = line;
            }
        }
    }

    fn max_scroll_offset(&self, viewport: u16) -> u16 {
        let (lines, _) = build_display_lines(&self.controller, &self.search);
        (lines.len() as u16).saturating_sub(viewport)
    }
}

pub async fn run_chat(
    controller: ChatController,
    client: BankingClient,
) -> Result<(), Box<dyn Error>> {
    let notices = NoticeBoard::default();
    let controller = controller.with_notifier(Box::new(notices.clone()));
    let (service, mut rx) = ChatRequestService::new();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = ChatUi {
        controller,
        client,
        service,
        search: SearchState::new(),
        notices,
        input: String::new(),
        search_open: false,
        scroll_offset: 0,
        auto_scroll: true,
    };

    let result = loop {
        terminal.draw(|f| draw(f, &app))?;

        let viewport = transcript_viewport(terminal.size().map(|s| s.height).unwrap_or(0), &app);

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break Ok(());
                    }
                    if app.search_open {
                        handle_search_key(&mut app, key.code, key.modifiers);
                    } else {
                        handle_chat_key(&mut app, key.code, key.modifiers, viewport);
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.auto_scroll = false;
                        app.scroll_offset = app.scroll_offset.saturating_sub(3);
                    }
                    MouseEventKind::ScrollDown => {
                        let max = app.max_scroll_offset(viewport);
                        app.scroll_offset = app.scroll_offset.saturating_add(3).min(max);
                        if app.scroll_offset >= max {
                            app.auto_scroll = true;
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Settle any completed round trips.
        let mut settled = false;
        while let Ok((outcome, request_id)) = rx.try_recv() {
            app.controller.apply(outcome, request_id);
            settled = true;
        }
        if settled {
            app.search.refresh(app.controller.messages());
            app.auto_scroll = true;
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn handle_chat_key(app: &mut ChatUi, code: KeyCode, modifiers: KeyModifiers, viewport: u16) {
    match code {
        KeyCode::Char('f') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.search_open = true;
            app.search.refresh(app.controller.messages());
        }
        KeyCode::Char('e') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.export_session();
        }
        KeyCode::Char('l') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_session();
        }
        KeyCode::Esc => app.controller.dismiss_error(),
        KeyCode::Enter => app.submit_input(),
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Up => {
            app.auto_scroll = false;
            app.scroll_offset = app.scroll_offset.saturating_sub(1);
        }
        KeyCode::Down => {
            let max = app.max_scroll_offset(viewport);
            app.scroll_offset = app.scroll_offset.saturating_add(1).min(max);
            if app.scroll_offset >= max {
                app.auto_scroll = true;
            }
        }
        _ => {}
    }
}

fn handle_search_key(app: &mut ChatUi, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Esc => {
            app.search_open = false;
            app.search.clear();
            app.auto_scroll = true;
        }
        KeyCode::Enter | KeyCode::Down => {
            app.search.next();
            app.jump_to_current_match();
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.search.prev();
            app.jump_to_current_match();
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            let mut query = app.search.query().to_string();
            query.push(c);
            app.search.set_query(&query, app.controller.messages());
            app.jump_to_current_match();
        }
        KeyCode::Backspace => {
            let mut query = app.search.query().to_string();
            query.pop();
            app.search.set_query(&query, app.controller.messages());
        }
        _ => {}
    }
}

fn transcript_viewport(term_height: u16, app: &ChatUi) -> u16 {
    let mut used = INPUT_HEIGHT + 1 + 1; // input box, status line, transcript title
    if app.search_open {
        used += SEARCH_HEIGHT;
    }
    term_height.saturating_sub(used)
}

fn draw(f: &mut Frame, app: &ChatUi) {
    let mut constraints = Vec::new();
    if app.search_open {
        constraints.push(Constraint::Length(SEARCH_HEIGHT));
    }
    constraints.push(Constraint::Min(1));
    constraints.push(Constraint::Length(1));
    constraints.push(Constraint::Length(INPUT_HEIGHT));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    let mut next = 0;
    if app.search_open {
        draw_search_bar(f, app, chunks[next]);
        next += 1;
    }
    draw_transcript(f, app, chunks[next]);
    draw_status_line(f, app, chunks[next + 1]);
    draw_input(f, app, chunks[next + 2]);
}

fn draw_search_bar(f: &mut Frame, app: &ChatUi, area: ratatui::layout::Rect) {
    let info = if !app.search.matches().is_empty() {
        format!("{} of {}", app.search.cursor() + 1, app.search.matches().len())
    } else if !app.search.query().trim().is_empty() {
        "No results".to_string()
    } else {
        "Type to search".to_string()
    };
    let bar = Paragraph::new(app.search.query())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Search — {info} (Enter next, Shift+Tab prev, Esc close)")),
        );
    f.render_widget(bar, area);
}

fn draw_transcript(f: &mut Frame, app: &ChatUi, area: ratatui::layout::Rect) {
    let (lines, _) = build_display_lines(&app.controller, &app.search);
    let available = area.height.saturating_sub(1);
    let total = lines.len() as u16;
    let max_offset = total.saturating_sub(available);
    let offset = if app.auto_scroll {
        max_offset
    } else {
        app.scroll_offset.min(max_offset)
    };

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(format!("Teller — {}", app.controller.session_id())))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(transcript, area);
}

fn draw_status_line(f: &mut Frame, app: &ChatUi, area: ratatui::layout::Rect) {
    let line = if let Some(banner) = app.controller.error() {
        Line::from(Span::styled(
            format!("⚠ {banner} (Esc to dismiss)"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else if app.controller.is_sending() {
        Line::from(Span::styled(
            "Analyzing your request and routing to the best specialist…",
            Style::default().fg(Color::Yellow),
        ))
    } else if let Some((notice, severity)) = app.notices.current() {
        Line::from(Span::styled(notice, Style::default().fg(severity_color(severity))))
    } else {
        Line::from(Span::styled(HINT, Style::default().fg(Color::DarkGray)))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_input(f: &mut Frame, app: &ChatUi, area: ratatui::layout::Rect) {
    let style = if app.controller.is_sending() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    let input = Paragraph::new(app.input.as_str())
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Ask me anything about your banking needs…"),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(input, area);

    if !app.search_open {
        f.set_cursor_position((
            area.x + (app.input.len() as u16).min(area.width.saturating_sub(2)) + 1,
            area.y + 1,
        ));
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

/// Render the transcript to styled lines, returning the first line index of
/// each message so search navigation can scroll to a match.
fn build_display_lines(
    controller: &ChatController,
    search: &SearchState,
) -> (Vec<Line<'static>>, Vec<u16>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut starts: Vec<u16> = Vec::new();
    let current_match = search.current();

    for (index, message) in controller.messages().iter().enumerate() {
        starts.push(lines.len() as u16);
        let highlighted = current_match == Some(index);
        match message.role {
            Role::User => push_user_lines(&mut lines, message, highlighted),
            Role::Agent => push_agent_lines(&mut lines, message, highlighted),
            Role::Error => push_error_lines(&mut lines, message, highlighted),
        }
        lines.push(Line::from(""));
    }

    (lines, starts)
}

fn header_style(base: Style, highlighted: bool) -> Style {
    if highlighted {
        base.add_modifier(Modifier::REVERSED)
    } else {
        base
    }
}

fn push_user_lines(lines: &mut Vec<Line<'static>>, message: &Message, highlighted: bool) {
    let style = Style::default().fg(Color::Cyan);
    lines.push(Line::from(vec![
        Span::styled(
            "You ",
            header_style(style.add_modifier(Modifier::BOLD), highlighted),
        ),
        Span::styled(message.timestamp.format("%H:%M").to_string(), Style::default().fg(Color::DarkGray)),
    ]));
    for content_line in message.content.lines() {
        lines.push(Line::from(Span::styled(content_line.to_string(), style)));
    }
}

fn push_agent_lines(lines: &mut Vec<Line<'static>>, message: &Message, highlighted: bool) {
    let agent_name = message.agent_name.as_deref();
    let route = routing::resolve(agent_name);
    let badge_color = hex_color(route.color);

    lines.push(Line::from(vec![
        Span::styled(
            format!("{} {} ", route.icon, route.label),
            header_style(
                Style::default().fg(badge_color).add_modifier(Modifier::BOLD),
                highlighted,
            ),
        ),
        Span::styled(message.timestamp.format("%H:%M").to_string(), Style::default().fg(Color::DarkGray)),
    ]));
    for content_line in message.content.lines() {
        lines.push(Line::from(Span::styled(
            content_line.to_string(),
            Style::default().fg(Color::White),
        )));
    }
    // Routed responses carry an attribution badge; direct answers from the
    // routing agent itself do not.
    if agent_name.is_some_and(|name| name != MAIN_AGENT) {
        lines.push(Line::from(Span::styled(
            format!("  ↳ routed to {}", route.label),
            Style::default().fg(badge_color),
        )));
    }
}

fn push_error_lines(lines: &mut Vec<Line<'static>>, message: &Message, highlighted: bool) {
    let style = Style::default().fg(Color::Red);
    lines.push(Line::from(Span::styled(
        "⚠ System ".to_string(),
        header_style(style.add_modifier(Modifier::BOLD), highlighted),
    )));
    for content_line in message.content.lines() {
        lines.push(Line::from(Span::styled(content_line.to_string(), style)));
    }
}

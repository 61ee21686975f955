//! Custom widgets for the TUI

use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::chat_log::ChatMessage;
use crate::dispatcher::{InputMode, ERROR_PREFIX};

use super::theme::Theme;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Wrap a long string into multiple lines, respecting unicode width
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 || text.width() <= max_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for c in text.chars() {
        let char_width = c.width().unwrap_or(1);
        if current_width + char_width > max_width && !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
            current_width = 0;
        }
        current_line.push(c);
        current_width += char_width;
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Header bar with title, server and AI status
pub struct HeaderBar<'a> {
    pub server: &'a str,
    pub game_id: Option<i64>,
    pub agent_busy: bool,
    pub spinner_frame: usize,
    pub last_synced_at: Option<DateTime<Local>>,
}

impl Widget for HeaderBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let mut spans = vec![
            Span::styled("◆ ", Theme::header_mark()),
            Span::styled("Turtle Soup", Theme::header_title()),
        ];
        if let Some(id) = self.game_id {
            spans.push(Span::styled(format!("  game #{id}"), Theme::header_meta()));
        }
        if self.agent_busy {
            let spinner = SPINNER[self.spinner_frame % SPINNER.len()];
            spans.push(Span::styled(
                format!("  {spinner} AI is thinking"),
                Theme::agent_thinking(),
            ));
        }
        buf.set_line(area.x + 1, area.y, &Line::from(spans), area.width.saturating_sub(2));

        let sync = match self.last_synced_at {
            Some(at) => format!("{} · synced {} ", self.server, at.format("%H:%M:%S")),
            None => format!("{} · connecting… ", self.server),
        };
        let sync_len = sync.width() as u16;
        let sync_x = area.x + area.width.saturating_sub(sync_len + 1);
        buf.set_span(sync_x, area.y, &Span::styled(sync, Theme::header_meta()), sync_len + 1);
    }
}

/// Puzzle text of the running game
pub struct PuzzlePanel<'a> {
    pub puzzle: Option<&'a str>,
}

impl Widget for PuzzlePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::panel_border())
            .title(Span::styled(" Puzzle ", Theme::panel_title()));

        let paragraph = match self.puzzle {
            Some(text) => Paragraph::new(text).style(Theme::puzzle_text()),
            None => Paragraph::new("No game in progress. Ctrl+N starts one.").style(Theme::puzzle_empty()),
        };
        paragraph
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Status line for command feedback
pub struct StatusBar<'a> {
    pub command_in_flight: bool,
    pub spinner_frame: usize,
    pub notice: Option<&'a str>,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = if self.command_in_flight {
            let spinner = SPINNER[self.spinner_frame % SPINNER.len()];
            Line::from(vec![
                Span::styled(format!("{spinner} "), Theme::status_sending()),
                Span::styled("Sending…", Theme::status_sending()),
            ])
        } else if let Some(notice) = self.notice {
            Line::from(vec![
                Span::styled("! ", Theme::status_notice()),
                Span::styled(notice, Theme::status_notice()),
            ])
        } else {
            Line::from(vec![
                Span::styled("● ", Theme::status_ready_dot()),
                Span::styled("Ready", Theme::status_ready()),
            ])
        };

        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));
    }
}

/// Input box widget
pub struct InputBox<'a> {
    pub content: &'a str,
    pub mode: InputMode,
    pub speaker: &'a str,
}

impl Widget for InputBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mode_style = Theme::mode_badge(self.mode);
        let title = Line::from(vec![
            Span::raw(" "),
            Span::styled(format!(" {} ", self.mode.label()), mode_style),
            Span::styled(format!(" as {} ", self.speaker), Theme::header_meta()),
        ]);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::input_border())
            .title(title);

        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.content.is_empty() {
            ("Type a question or answer… (Tab switches mode)", Theme::input_placeholder())
        } else {
            (self.content, Theme::input_text())
        };

        Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

/// Help bar showing key bindings
pub struct HelpBar;

impl Widget for HelpBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bindings = [
            ("Enter", "Send"),
            ("Tab", "Ask/Answer"),
            ("Ctrl+N", "New game"),
            ("Ctrl+E", "End game"),
            ("↑↓", "Scroll"),
            ("Ctrl+C", "Quit"),
        ];

        let mut spans = vec![Span::raw(" ")];
        for (i, (key, desc)) in bindings.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", Theme::hint_separator()));
            }
            spans.push(Span::styled(*key, Theme::hint_key()));
            spans.push(Span::styled(format!(" {}", desc), Theme::hint_desc()));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

/// Render one transcript entry to display lines.
///
/// Entries spoken under `own_name` get a different badge so players can spot
/// their own questions among everyone else's.
pub fn render_message_lines(
    msg: &ChatMessage,
    own_name: &str,
    max_width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = max_width.saturating_sub(4);

    if msg.is_system() {
        let style = if msg.content.starts_with(ERROR_PREFIX) {
            Theme::error_line()
        } else {
            Theme::system_line()
        };
        for wrapped in msg.content.lines().flat_map(|l| wrap_text(l, content_width)) {
            lines.push(Line::from(vec![Span::raw("  "), Span::styled(wrapped, style)]));
        }
        return lines;
    }

    let badge_style = Theme::speaker_badge(msg.speaker == own_name);
    lines.push(Line::from(Span::styled(
        format!(" {} ", msg.speaker),
        badge_style,
    )));

    for content_line in msg.content.lines() {
        for (i, wrapped) in wrap_text(content_line, content_width).into_iter().enumerate() {
            let indent = if i == 0 { "  " } else { "    " };
            lines.push(Line::from(vec![
                Span::raw(indent),
                Span::styled(wrapped, Style::default()),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines
}

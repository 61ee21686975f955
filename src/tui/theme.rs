//! Styles for the soup TUI, one per screen element
//!
//! Plain ANSI colors so the palette follows the user's terminal theme.

use ratatui::style::{Color, Modifier, Style};

use crate::dispatcher::InputMode;

pub struct Theme;

impl Theme {
    const ACCENT: Color = Color::Cyan;
    const FAINT: Color = Color::DarkGray;

    /// Black bold text on a colored block
    fn badge(bg: Color) -> Style {
        Style::default()
            .bg(bg)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    }

    fn faint() -> Style {
        Style::default().fg(Self::FAINT)
    }

    // Header
    pub fn header_title() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn header_mark() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    pub fn header_meta() -> Style {
        Self::faint()
    }

    pub fn agent_thinking() -> Style {
        Style::default().fg(Color::Yellow)
    }

    // Bordered panels (puzzle, chat)
    pub fn panel_border() -> Style {
        Self::faint()
    }

    pub fn panel_title() -> Style {
        Self::faint()
    }

    pub fn puzzle_text() -> Style {
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD)
    }

    pub fn puzzle_empty() -> Style {
        Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC)
    }

    // Chat transcript
    pub fn speaker_badge(own: bool) -> Style {
        Self::badge(if own { Color::Green } else { Self::ACCENT })
    }

    pub fn system_line() -> Style {
        Self::faint().add_modifier(Modifier::ITALIC)
    }

    pub fn error_line() -> Style {
        Style::default().fg(Color::Red)
    }

    // Status line
    pub fn status_sending() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    pub fn status_notice() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn status_ready_dot() -> Style {
        Style::default().fg(Color::Green)
    }

    pub fn status_ready() -> Style {
        Style::default().add_modifier(Modifier::DIM)
    }

    // Input box
    pub fn mode_badge(mode: InputMode) -> Style {
        match mode {
            InputMode::Ask => Self::badge(Self::ACCENT),
            InputMode::Answer => Self::badge(Color::Yellow),
        }
    }

    pub fn input_border() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    pub fn input_placeholder() -> Style {
        Self::faint()
    }

    pub fn input_text() -> Style {
        Style::default()
    }

    // Key hints
    pub fn hint_key() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn hint_desc() -> Style {
        Self::faint()
    }

    pub fn hint_separator() -> Style {
        Self::faint()
    }
}

//! Line editor for the TUI input box

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Result of handling a key event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    None,
    /// Enter pressed with a non-empty buffer; the buffer has been taken
    Submit(String),
    Quit,
    ToggleMode,
    NewGame,
    EndGame,
    ScrollUp,
    ScrollDown,
    Escape,
}

/// Input state manager
///
/// Note: `cursor` is a CHARACTER index, not a byte index, so CJK input
/// (the game is mostly played in Chinese) edits correctly.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub buffer: String,
    pub cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn char_to_byte_index(&self, char_idx: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }

    fn insert_char(&mut self, c: char) {
        let byte_idx = self.char_to_byte_index(self.cursor);
        self.buffer.insert(byte_idx, c);
        self.cursor += 1;
    }

    fn remove_char_before_cursor(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.remove_char_at_cursor();
    }

    fn remove_char_at_cursor(&mut self) {
        let byte_idx = self.char_to_byte_index(self.cursor);
        if let Some(ch) = self.buffer[byte_idx..].chars().next() {
            self.buffer
                .replace_range(byte_idx..byte_idx + ch.len_utf8(), "");
        }
    }

    /// Put text back into an empty box, e.g. when a command could not be sent.
    pub fn restore(&mut self, text: &str) {
        if self.buffer.is_empty() {
            self.buffer = text.to_string();
            self.cursor = self.char_count();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => InputAction::Quit,
            KeyCode::Char('n') if ctrl => InputAction::NewGame,
            KeyCode::Char('e') if ctrl => InputAction::EndGame,
            KeyCode::Char('u') if ctrl => {
                self.buffer.clear();
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                InputAction::None
            }

            KeyCode::Enter => {
                if self.buffer.trim().is_empty() {
                    return InputAction::None;
                }
                let input = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                InputAction::Submit(input)
            }

            KeyCode::Backspace => {
                self.remove_char_before_cursor();
                InputAction::None
            }
            KeyCode::Delete => {
                self.remove_char_at_cursor();
                InputAction::None
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputAction::None
            }
            KeyCode::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                }
                InputAction::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputAction::None
            }
            KeyCode::End => {
                self.cursor = self.char_count();
                InputAction::None
            }

            KeyCode::Up | KeyCode::PageUp => InputAction::ScrollUp,
            KeyCode::Down | KeyCode::PageDown => InputAction::ScrollDown,
            KeyCode::Tab => InputAction::ToggleMode,
            KeyCode::Esc => InputAction::Escape,

            KeyCode::Char(c) => {
                self.insert_char(c);
                InputAction::None
            }

            _ => InputAction::None,
        }
    }

    /// Cursor position in terminal columns (wide characters take two)
    pub fn cursor_display_width(&self) -> usize {
        self.buffer
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }
}

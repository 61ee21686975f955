//! Terminal User Interface module
//!
//! Full-screen client for the shared turtle-soup room.

mod app;
mod input;
pub mod slash_commands;
mod theme;
mod widgets;

pub use app::App;
pub use slash_commands::{
    confirm_prompt, needs_confirmation, parse_line, ConfirmGuard, GameCommand, ParsedLine,
};
pub use theme::Theme;

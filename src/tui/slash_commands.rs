//! Slash commands shared by the TUI input box and plain mode
//!
//! `/new`, `/end`, `/ask`, `/answer`, `/name <NAME>`, `/help`, `/quit`.
//! Anything that is not a known slash command is player text.

use std::fmt;
use std::time::{Duration, Instant};

/// A guarded command must be repeated within this window to run
pub const CONFIRM_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    New,
    End,
    Ask,
    Answer,
    Name,
    Help,
    Quit,
}

impl GameCommand {
    pub fn all() -> &'static [GameCommand] {
        &[
            GameCommand::New,
            GameCommand::End,
            GameCommand::Ask,
            GameCommand::Answer,
            GameCommand::Name,
            GameCommand::Help,
            GameCommand::Quit,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::New => "new",
            GameCommand::End => "end",
            GameCommand::Ask => "ask",
            GameCommand::Answer => "answer",
            GameCommand::Name => "name",
            GameCommand::Help => "help",
            GameCommand::Quit => "quit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameCommand::New => "start a new game",
            GameCommand::End => "end the current game",
            GameCommand::Ask => "send following lines as questions",
            GameCommand::Answer => "send following lines as answers",
            GameCommand::Name => "set your speaker name",
            GameCommand::Help => "list commands",
            GameCommand::Quit => "leave",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "q" | "exit" => Some(GameCommand::Quit),
            "ans" => Some(GameCommand::Answer),
            _ => Self::all()
                .iter()
                .copied()
                .find(|cmd| cmd.name() == name),
        }
    }

    /// One help line per command
    pub fn help_lines() -> Vec<String> {
        Self::all()
            .iter()
            .map(|cmd| format!("/{:<7} {}", cmd.name(), cmd.description()))
            .collect()
    }
}

impl fmt::Display for GameCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Whether running `command` now needs a second entry to confirm.
///
/// Starting a game interrupts the one other players are guessing at, and
/// ending one always does.
pub fn needs_confirmation(command: GameCommand, puzzle_running: bool) -> bool {
    match command {
        GameCommand::New => puzzle_running,
        GameCommand::End => true,
        _ => false,
    }
}

pub fn confirm_prompt(command: GameCommand) -> &'static str {
    match command {
        GameCommand::New => {
            "A game is running and others may still be guessing. Repeat to start a new one"
        }
        GameCommand::End => "Others may still be guessing. Repeat to end the game",
        _ => "Repeat to confirm",
    }
}

/// Double-entry confirmation for destructive commands
#[derive(Debug, Default)]
pub struct ConfirmGuard {
    armed: Option<(GameCommand, Instant)>,
}

impl ConfirmGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `command` may run now. A guarded command only arms the guard
    /// the first time; the same command again within `CONFIRM_WINDOW` runs.
    pub fn check(&mut self, command: GameCommand, guarded: bool, now: Instant) -> bool {
        self.expire(now);
        if !guarded {
            self.armed = None;
            return true;
        }
        match self.armed.take() {
            Some((armed, _)) if armed == command => true,
            _ => {
                self.armed = Some((command, now));
                false
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn clear(&mut self) {
        self.armed = None;
    }

    pub fn expire(&mut self, now: Instant) {
        if matches!(self.armed, Some((_, at)) if now.duration_since(at) > CONFIRM_WINDOW) {
            self.armed = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A slash command and its (trimmed) arguments
    Command(GameCommand, String),
    /// Player text to submit in the current mode
    Text(String),
}

pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix('/') {
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        if let Some(cmd) = GameCommand::from_name(&name.to_lowercase()) {
            return ParsedLine::Command(cmd, args.to_string());
        }
    }
    ParsedLine::Text(trimmed.to_string())
}

//! The client's single mutable aggregate

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::RwLock;

use crate::chat_log::{ChatLog, ChatMessage};
use crate::protocol::NO_GAME_ID;

/// The game as last observed by this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Server-assigned game id, `NO_GAME_ID` until the first successful poll
    pub id: i64,
    /// Puzzle text of the running game, if any
    pub puzzle: Option<String>,
    /// Whether the server's AI is currently evaluating a question or answer
    pub agent_busy: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: NO_GAME_ID,
            puzzle: None,
            agent_busy: false,
        }
    }
}

impl Session {
    pub fn is_observed(&self) -> bool {
        self.id != NO_GAME_ID
    }

    pub fn has_puzzle(&self) -> bool {
        self.puzzle.is_some()
    }
}

/// Mutable state shared by the poller and the dispatcher.
///
/// Every response is applied inside one write-lock section, so the two
/// never interleave their updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    pub session: Session,
    pub chat: ChatLog,
    pub last_synced_at: Option<DateTime<Local>>,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn snapshot(&self, command_in_flight: bool) -> StateSnapshot {
        StateSnapshot {
            session: self.session.clone(),
            cursor: self.chat.cursor(),
            history: self.chat.messages().to_vec(),
            command_in_flight,
            last_synced_at: self.last_synced_at,
        }
    }
}

pub type SharedState = Arc<RwLock<LocalState>>;

/// Read-only copy of `LocalState` handed to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub session: Session,
    pub cursor: u64,
    pub history: Vec<ChatMessage>,
    pub command_in_flight: bool,
    pub last_synced_at: Option<DateTime<Local>>,
}

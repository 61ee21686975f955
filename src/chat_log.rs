//! Append-only chat transcript for the current game
//!
//! The cursor counts messages merged from the server's poll stream for the
//! current game only. Local notices (errors, game-switch announcements) are
//! appended to the transcript but never advance the cursor, since the server
//! does not know about them.

use serde::{Deserialize, Serialize};

use crate::protocol::WireChat;

/// Speaker name used for locally generated notices
pub const SYSTEM_SPEAKER: &str = "system";

/// Where a transcript entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageOrigin {
    /// Merged from the server's chat stream
    Server,
    /// Generated by this client
    System,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: String,
    pub content: String,
    pub origin: MessageOrigin,
}

impl ChatMessage {
    pub fn server(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
            origin: MessageOrigin::Server,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            speaker: SYSTEM_SPEAKER.to_string(),
            content: content.into(),
            origin: MessageOrigin::System,
        }
    }

    pub fn is_system(&self) -> bool {
        self.origin == MessageOrigin::System
    }
}

impl From<WireChat> for ChatMessage {
    fn from(chat: WireChat) -> Self {
        Self::server(chat.sayer, chat.content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    cursor: u64,
    history: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of server messages already retrieved for the current game
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a batch from the poll stream in arrival order and advance the
    /// cursor by its size. Returns the number of appended messages.
    pub fn merge<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<ChatMessage>,
    {
        let before = self.history.len();
        self.history.extend(batch.into_iter().map(Into::into));
        let added = self.history.len() - before;
        self.cursor += added as u64;
        added
    }

    /// Append a local entry without touching the cursor.
    pub fn push_local(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    /// Forget everything; used when the server moved to another game.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.history.clear();
    }
}

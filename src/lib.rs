//! Soup client
//!
//! Keeps a local view in sync with a shared turtle-soup puzzle server:
//! - Polls the server for the active game, the AI busy flag and new chat
//! - Detects when the server switched to a different game
//! - Sends game commands one at a time through a single-flight gate

pub mod chat_log;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod gate;
pub mod periodic;
pub mod poller;
pub mod protocol;
pub mod remote;
pub mod state;
pub mod tui;

pub use chat_log::{ChatLog, ChatMessage, MessageOrigin};
pub use client::SyncClient;
pub use config::ClientConfig;
pub use dispatcher::{CommandDispatcher, DispatchOutcome, InputMode, InputSubmission, SubmitOutcome};
pub use gate::{CommandGate, CommandPermit};
pub use periodic::PeriodicTask;
pub use poller::{PollReport, SessionPoller};
pub use remote::{HttpRemoteClient, RemoteClient};
pub use state::{LocalState, Session, SharedState, StateSnapshot};

/// Result type for soup client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the game server or loading config
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Unexpected HTTP status {status} from {endpoint}")]
    Status {
        endpoint: String,
        status: u16,
    },

    #[error("Malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ClientError {
    /// Whether this failure came from the exchange with the server
    /// (as opposed to local configuration problems).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ClientError::Transport { .. }
                | ClientError::Status { .. }
                | ClientError::MalformedResponse { .. }
        )
    }
}

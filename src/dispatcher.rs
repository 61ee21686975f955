//! User-initiated game commands
//!
//! Every command goes through the `CommandGate`: if another command is
//! still outstanding the call returns `Busy` without contacting the server
//! and without touching local state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::chat_log::ChatMessage;
use crate::gate::CommandGate;
use crate::protocol::{CommandRequest, CommandResponse};
use crate::remote::RemoteClient;
use crate::state::SharedState;

/// Prefix of the transcript entry shown for a rejected command
pub const ERROR_PREFIX: &str = "error: ";

/// How a dispatched command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Another command was in flight; nothing was sent
    Busy,
    /// The server accepted the command
    Completed,
    /// The server answered with a failure code
    Rejected { code: i64, message: String },
    /// The request never produced a usable response
    Failed,
}

impl DispatchOutcome {
    /// Whether the request reached the server (so the input was consumed)
    pub fn was_sent(&self) -> bool {
        !matches!(self, DispatchOutcome::Busy)
    }
}

/// Question or answer, chosen by the player when submitting text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Ask,
    Answer,
}

impl InputMode {
    pub fn toggled(self) -> Self {
        match self {
            InputMode::Ask => InputMode::Answer,
            InputMode::Answer => InputMode::Ask,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InputMode::Ask => "ask",
            InputMode::Answer => "answer",
        }
    }
}

/// Text submitted by the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSubmission {
    pub text: String,
    pub mode: InputMode,
    pub speaker_name: String,
}

impl InputSubmission {
    pub fn new(text: impl Into<String>, mode: InputMode, speaker_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode,
            speaker_name: speaker_name.into(),
        }
    }
}

/// Result of `SyncClient::submit` and of the client's game commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank text; nothing to send
    Empty,
    /// The server's AI is still working on the previous input; nothing was sent
    AgentBusy,
    Dispatched(DispatchOutcome),
}

impl SubmitOutcome {
    /// Whether the caller should keep the typed text
    pub fn keeps_input(&self) -> bool {
        match self {
            SubmitOutcome::Empty => false,
            SubmitOutcome::AgentBusy => true,
            SubmitOutcome::Dispatched(outcome) => !outcome.was_sent(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    NewGame,
    EndGame,
    Ask,
    Answer,
}

pub struct CommandDispatcher {
    remote: Arc<dyn RemoteClient>,
    state: SharedState,
    gate: CommandGate,
}

impl CommandDispatcher {
    pub fn new(remote: Arc<dyn RemoteClient>, state: SharedState, gate: CommandGate) -> Self {
        Self {
            remote,
            state,
            gate,
        }
    }

    pub fn gate(&self) -> &CommandGate {
        &self.gate
    }

    pub async fn start_session(&self) -> DispatchOutcome {
        self.dispatch(CommandKind::NewGame, CommandRequest::new_game())
            .await
    }

    pub async fn end_session(&self) -> DispatchOutcome {
        self.dispatch(CommandKind::EndGame, CommandRequest::end_game())
            .await
    }

    pub async fn ask(&self, content: &str, speaker_name: &str) -> DispatchOutcome {
        self.dispatch(CommandKind::Ask, CommandRequest::ask(content, speaker_name))
            .await
    }

    pub async fn answer(&self, content: &str, speaker_name: &str) -> DispatchOutcome {
        self.dispatch(
            CommandKind::Answer,
            CommandRequest::answer(content, speaker_name),
        )
        .await
    }

    async fn dispatch(&self, kind: CommandKind, request: CommandRequest) -> DispatchOutcome {
        let Some(permit) = self.gate.try_acquire() else {
            debug!("Command {} refused: another command is in flight", request.cmd);
            return DispatchOutcome::Busy;
        };

        debug!("Sending command {}", request.cmd);
        let outcome = match self.remote.command(&request).await {
            Ok(response) => self.apply_response(kind, response).await,
            Err(e) => {
                debug!("Command {} failed: {}", request.cmd, e);
                DispatchOutcome::Failed
            }
        };

        permit.release();
        outcome
    }

    async fn apply_response(&self, kind: CommandKind, response: CommandResponse) -> DispatchOutcome {
        let mut state = self.state.write().await;

        if !response.is_success() {
            let message = response.error_text();
            info!("Command rejected by server: {}", message);
            state
                .chat
                .push_local(ChatMessage::system(format!("{ERROR_PREFIX}{message}")));
            return DispatchOutcome::Rejected {
                code: response.code,
                message,
            };
        }

        match kind {
            CommandKind::NewGame => {
                state.session.puzzle = response.soup_question;
            }
            CommandKind::EndGame => {
                state.session.puzzle = None;
            }
            CommandKind::Ask | CommandKind::Answer => {}
        }

        DispatchOutcome::Completed
    }
}

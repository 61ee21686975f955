//! Synchronization client
//!
//! Owns the one `LocalState` of a client run together with the gate, the
//! poller and the dispatcher. Front ends only see `snapshot()` and the
//! command/submission calls; they never mutate the state themselves.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::dispatcher::{CommandDispatcher, InputMode, InputSubmission, SubmitOutcome};
use crate::gate::CommandGate;
use crate::periodic::PeriodicTask;
use crate::poller::SessionPoller;
use crate::remote::RemoteClient;
use crate::state::{LocalState, SharedState, StateSnapshot};

pub struct SyncClient {
    config: ClientConfig,
    state: SharedState,
    gate: CommandGate,
    poller: Arc<SessionPoller>,
    dispatcher: Arc<CommandDispatcher>,
    poll_task: Mutex<Option<PeriodicTask>>,
}

impl SyncClient {
    pub fn new(remote: Arc<dyn RemoteClient>, config: ClientConfig) -> Self {
        let state = LocalState::shared();
        let gate = CommandGate::new();
        let poller = Arc::new(SessionPoller::new(remote.clone(), state.clone()));
        let dispatcher = Arc::new(CommandDispatcher::new(remote, state.clone(), gate.clone()));

        Self {
            config,
            state,
            gate,
            poller,
            dispatcher,
            poll_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn poller(&self) -> Arc<SessionPoller> {
        self.poller.clone()
    }

    pub fn dispatcher(&self) -> Arc<CommandDispatcher> {
        self.dispatcher.clone()
    }

    /// Start the polling loop. Calling it again while running is a no-op.
    pub fn start(&self) {
        let mut slot = self.poll_slot();
        if slot.is_some() {
            return;
        }
        info!(
            "Polling {} every {}ms",
            self.config.server_url, self.config.poll_interval_ms
        );
        *slot = Some(self.poller.clone().spawn(self.config.poll_interval()));
    }

    pub fn is_polling(&self) -> bool {
        self.poll_slot()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(&self) {
        let task = self.poll_slot().take();
        if let Some(task) = task {
            debug!("Stopping {}", task.name());
            task.stop().await;
        }
    }

    fn poll_slot(&self) -> MutexGuard<'_, Option<PeriodicTask>> {
        self.poll_task.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        let state = self.state.read().await;
        state.snapshot(self.gate.is_in_flight())
    }

    pub fn is_command_in_flight(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Start a new game. Held back while the AI is busy, like `submit`.
    pub async fn start_session(&self) -> SubmitOutcome {
        if self.agent_blocks_input().await {
            debug!("New game refused while the AI is busy");
            return SubmitOutcome::AgentBusy;
        }
        SubmitOutcome::Dispatched(self.dispatcher.start_session().await)
    }

    /// End the running game. Held back while the AI is busy, like `submit`.
    pub async fn end_session(&self) -> SubmitOutcome {
        if self.agent_blocks_input().await {
            debug!("End game refused while the AI is busy");
            return SubmitOutcome::AgentBusy;
        }
        SubmitOutcome::Dispatched(self.dispatcher.end_session().await)
    }

    async fn agent_blocks_input(&self) -> bool {
        self.config.block_while_agent_busy && self.state.read().await.session.agent_busy
    }

    /// Forward player input as a question or an answer.
    pub async fn submit(&self, submission: InputSubmission) -> SubmitOutcome {
        let text = submission.text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }

        if self.agent_blocks_input().await {
            debug!("Submission refused while the AI is busy");
            return SubmitOutcome::AgentBusy;
        }

        let speaker = match submission.speaker_name.trim() {
            "" => self.config.default_speaker.as_str(),
            name => name,
        };

        let outcome = match submission.mode {
            InputMode::Ask => self.dispatcher.ask(text, speaker).await,
            InputMode::Answer => self.dispatcher.answer(text, speaker).await,
        };
        SubmitOutcome::Dispatched(outcome)
    }
}

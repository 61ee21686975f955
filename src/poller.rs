//! Session polling
//!
//! Each poll sends the locally known game id and chat cursor to `/update`
//! and merges the reply into `LocalState`. Failures leave the state alone;
//! the loop keeps going for the lifetime of the client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info};

use crate::chat_log::ChatMessage;
use crate::periodic::PeriodicTask;
use crate::protocol::{UpdateRequest, UpdateResponse};
use crate::remote::RemoteClient;
use crate::state::{LocalState, SharedState};
use crate::Result;

/// Notice appended to a fresh transcript after the server switched games
pub const SESSION_CHANGED_NOTICE: &str = "session changed";

/// What a successful poll did to the local state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub session_changed: bool,
    pub appended: usize,
}

pub struct SessionPoller {
    remote: Arc<dyn RemoteClient>,
    state: SharedState,
    /// Whether the previous attempt failed, to log recovery once
    failing: AtomicBool,
}

impl SessionPoller {
    pub fn new(remote: Arc<dyn RemoteClient>, state: SharedState) -> Self {
        Self {
            remote,
            state,
            failing: AtomicBool::new(false),
        }
    }

    /// Run one poll. On error the local state is untouched.
    pub async fn poll(&self) -> Result<PollReport> {
        let request = {
            let state = self.state.read().await;
            UpdateRequest::get_info(state.session.id, state.chat.cursor())
        };

        let response = self.remote.update(&request).await?;

        let mut state = self.state.write().await;
        Ok(apply_update(&mut state, response))
    }

    /// Poll once, swallowing failures. Used as the periodic tick.
    pub async fn tick(&self) {
        match self.poll().await {
            Ok(report) => {
                if self.failing.swap(false, Ordering::Relaxed) {
                    info!("Polling recovered");
                }
                if report.appended > 0 {
                    debug!("Merged {} new chat message(s)", report.appended);
                }
            }
            Err(e) => {
                if !self.failing.swap(true, Ordering::Relaxed) {
                    info!("Polling failed, will keep retrying: {}", e);
                } else {
                    debug!("Poll failed: {}", e);
                }
            }
        }
    }

    /// Start polling every `delay` (measured from the end of each attempt).
    pub fn spawn(self: Arc<Self>, delay: Duration) -> PeriodicTask {
        PeriodicTask::spawn("session-poller", delay, move || {
            let poller = Arc::clone(&self);
            async move { poller.tick().await }
        })
    }
}

/// Merge one `/update` reply into the local state.
pub fn apply_update(state: &mut LocalState, response: UpdateResponse) -> PollReport {
    let session_changed = response.game_id != state.session.id;
    if session_changed {
        info!(
            "Game changed from {} to {}",
            state.session.id, response.game_id
        );
        state.chat.reset();
        state.chat.push_local(ChatMessage::system(SESSION_CHANGED_NOTICE));
        state.session.id = response.game_id;
    }

    state.session.agent_busy = response.ai_running;
    state.session.puzzle = response
        .current_soup
        .filter(|soup| !soup.trim().is_empty());

    let appended = state.chat.merge(response.new_chats);
    state.last_synced_at = Some(Local::now());

    PollReport {
        session_changed,
        appended,
    }
}

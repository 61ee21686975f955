//! Integration tests for the soup client against an in-memory server

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use soup_client::chat_log::ChatMessage;
use soup_client::protocol::{CommandRequest, CommandResponse, UpdateRequest, UpdateResponse, WireChat};
use soup_client::{
    ClientConfig, ClientError, DispatchOutcome, InputMode, InputSubmission, RemoteClient, Result,
    SubmitOutcome, SyncClient,
};
use tempfile::TempDir;
use tokio::sync::Notify;

/// Scripted server: replies are popped in order, requests are recorded.
#[derive(Default)]
struct FakeServer {
    updates: Mutex<VecDeque<Result<UpdateResponse>>>,
    replies: Mutex<VecDeque<Result<CommandResponse>>>,
    update_requests: Mutex<Vec<UpdateRequest>>,
    commands: Mutex<Vec<CommandRequest>>,
    /// When set, `command` waits on it before replying
    hold: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl FakeServer {
    fn held(hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    fn push_update(&self, update: Result<UpdateResponse>) {
        self.updates.lock().unwrap().push_back(update);
    }

    fn push_reply(&self, reply: Result<CommandResponse>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn commands(&self) -> Vec<CommandRequest> {
        self.commands.lock().unwrap().clone()
    }

    fn update_requests(&self) -> Vec<UpdateRequest> {
        self.update_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClient for FakeServer {
    async fn command(&self, request: &CommandRequest) -> Result<CommandResponse> {
        self.commands.lock().unwrap().push(request.clone());
        self.entered.notify_one();
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(ok()))
    }

    async fn update(&self, request: &UpdateRequest) -> Result<UpdateResponse> {
        self.update_requests.lock().unwrap().push(request.clone());
        let update = self.updates.lock().unwrap().pop_front();
        update.unwrap_or_else(|| Ok(update_for(request.game_id.max(1), false, None, &[])))
    }
}

fn ok() -> CommandResponse {
    CommandResponse {
        code: 0,
        ..Default::default()
    }
}

fn update_for(game_id: i64, busy: bool, soup: Option<&str>, chats: &[(&str, &str)]) -> UpdateResponse {
    UpdateResponse {
        game_id,
        ai_running: busy,
        current_soup: soup.map(str::to_string),
        new_chats: chats
            .iter()
            .map(|(sayer, content)| WireChat {
                sayer: sayer.to_string(),
                content: content.to_string(),
            })
            .collect(),
    }
}

fn transport_error() -> ClientError {
    ClientError::Transport {
        endpoint: "http://127.0.0.1:42345/cmd".to_string(),
        message: "connection refused".to_string(),
    }
}

/// Decode a raw `/cmd` body the way the HTTP client does.
fn reply_from_json(raw: &str) -> Result<CommandResponse> {
    serde_json::from_str(raw).map_err(|e| ClientError::MalformedResponse {
        endpoint: "http://127.0.0.1:42345/cmd".to_string(),
        message: e.to_string(),
    })
}

fn client_with(server: Arc<FakeServer>) -> SyncClient {
    SyncClient::new(server, ClientConfig::default())
}

/// Poll the first game into place: id 5, puzzle "Q1", one chat from A.
async fn observe_first_game(client: &SyncClient, server: &FakeServer) {
    server.push_update(Ok(update_for(5, false, Some("Q1"), &[("A", "hi")])));
    client.poller().poll().await.unwrap();
}

#[tokio::test]
async fn test_first_poll_adopts_game() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());

    observe_first_game(&client, &server).await;

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.session.id, 5);
    assert_eq!(snapshot.session.puzzle.as_deref(), Some("Q1"));
    assert_eq!(
        snapshot.history,
        vec![ChatMessage::system("session changed"), ChatMessage::server("A", "hi")]
    );
    assert_eq!(snapshot.cursor, 1);
    assert!(snapshot.last_synced_at.is_some());

    let requests = server.update_requests();
    assert_eq!(requests[0], UpdateRequest::get_info(-1, 0));
}

#[tokio::test]
async fn test_empty_poll_only_updates_busy_flag() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;
    let before = client.snapshot().await;

    server.push_update(Ok(update_for(5, true, Some("Q1"), &[])));
    client.poller().poll().await.unwrap();

    let after = client.snapshot().await;
    assert!(after.session.agent_busy);
    assert_eq!(after.history, before.history);
    assert_eq!(after.cursor, before.cursor);
    assert_eq!(server.update_requests()[1], UpdateRequest::get_info(5, 1));
}

#[tokio::test]
async fn test_command_refused_while_another_is_in_flight() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    let dispatcher = client.dispatcher();

    let permit = dispatcher.gate().try_acquire().unwrap();
    let before = client.snapshot().await;

    assert_eq!(
        client.start_session().await,
        SubmitOutcome::Dispatched(DispatchOutcome::Busy)
    );
    assert!(server.commands().is_empty());
    assert!(client.is_command_in_flight());
    assert_eq!(client.snapshot().await.history, before.history);

    drop(permit);
    assert!(!client.is_command_in_flight());
}

#[tokio::test]
async fn test_end_session_clears_puzzle_only() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    server.push_update(Ok(update_for(5, true, Some("Q1"), &[])));
    client.poller().poll().await.unwrap();

    assert_eq!(
        client.dispatcher().end_session().await,
        DispatchOutcome::Completed
    );

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.session.puzzle, None);
    assert_eq!(snapshot.session.id, 5);
    assert!(snapshot.session.agent_busy);
    assert_eq!(server.commands(), vec![CommandRequest::end_game()]);
}

#[tokio::test]
async fn test_new_session_sets_puzzle_and_next_poll_switches_game() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;

    server.push_reply(Ok(CommandResponse {
        code: 0,
        msg: None,
        soup_question: Some("Q2".to_string()),
    }));
    assert_eq!(
        client.start_session().await,
        SubmitOutcome::Dispatched(DispatchOutcome::Completed)
    );

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.session.puzzle.as_deref(), Some("Q2"));
    assert_eq!(snapshot.session.id, 5);

    server.push_update(Ok(update_for(6, false, Some("Q2"), &[])));
    let report = client.poller().poll().await.unwrap();
    assert!(report.session_changed);

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.session.id, 6);
    assert_eq!(snapshot.cursor, 0);
    assert_eq!(snapshot.history, vec![ChatMessage::system("session changed")]);
}

#[tokio::test]
async fn test_concurrent_commands_reach_server_once() {
    let hold = Arc::new(Notify::new());
    let server = Arc::new(FakeServer::held(hold.clone()));
    let client = Arc::new(client_with(server.clone()));

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.start_session().await })
    };
    server.entered.notified().await;
    assert!(client.is_command_in_flight());

    let second = client
        .submit(InputSubmission::new("Was he alone?", InputMode::Ask, "Mia"))
        .await;
    assert_eq!(second, SubmitOutcome::Dispatched(DispatchOutcome::Busy));
    assert!(second.keeps_input());
    assert_eq!(server.commands(), vec![CommandRequest::new_game()]);

    hold.notify_one();
    assert_eq!(
        first.await.unwrap(),
        SubmitOutcome::Dispatched(DispatchOutcome::Completed)
    );
    assert!(!client.is_command_in_flight());
}

#[tokio::test]
async fn test_rejected_command_appends_error_without_moving_cursor() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;

    server.push_reply(Ok(CommandResponse {
        code: 2,
        msg: Some("a game is already running".to_string()),
        soup_question: None,
    }));
    let outcome = client.start_session().await;
    assert_eq!(
        outcome,
        SubmitOutcome::Dispatched(DispatchOutcome::Rejected {
            code: 2,
            message: "a game is already running".to_string(),
        })
    );

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.cursor, 1);
    assert_eq!(
        snapshot.history.last(),
        Some(&ChatMessage::system("error: a game is already running"))
    );
    assert_eq!(snapshot.session.puzzle.as_deref(), Some("Q1"));

    // The local error line does not shift what the server is asked for
    server.push_update(Ok(update_for(5, false, Some("Q1"), &[("B", "no")])));
    client.poller().poll().await.unwrap();
    assert_eq!(server.update_requests()[1], UpdateRequest::get_info(5, 1));
    assert_eq!(client.snapshot().await.cursor, 2);
}

#[tokio::test]
async fn test_reply_without_code_is_dropped() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;
    let before = client.snapshot().await;

    server.push_reply(reply_from_json(
        r#"{"msg": "New game started.", "soup_question": "Q9"}"#,
    ));
    assert_eq!(
        client.start_session().await,
        SubmitOutcome::Dispatched(DispatchOutcome::Failed)
    );

    assert_eq!(client.snapshot().await, before);
    assert!(!client.is_command_in_flight());
}

#[tokio::test]
async fn test_busy_agent_holds_back_game_commands() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    server.push_update(Ok(update_for(5, true, Some("Q1"), &[])));
    client.poller().poll().await.unwrap();
    let before = client.snapshot().await;

    assert_eq!(client.start_session().await, SubmitOutcome::AgentBusy);
    assert_eq!(client.end_session().await, SubmitOutcome::AgentBusy);
    assert!(server.commands().is_empty());
    assert_eq!(client.snapshot().await, before);

    // Once the AI is done the command goes out
    server.push_update(Ok(update_for(5, false, Some("Q1"), &[])));
    client.poller().poll().await.unwrap();
    assert_eq!(
        client.end_session().await,
        SubmitOutcome::Dispatched(DispatchOutcome::Completed)
    );
    assert_eq!(server.commands(), vec![CommandRequest::end_game()]);
}

#[tokio::test]
async fn test_transport_failure_changes_nothing_and_frees_gate() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;
    let before = client.snapshot().await;

    server.push_reply(Err(transport_error()));
    assert_eq!(
        client.end_session().await,
        SubmitOutcome::Dispatched(DispatchOutcome::Failed)
    );

    assert_eq!(client.snapshot().await, before);
    assert!(!client.is_command_in_flight());

    // The next command goes through
    assert_eq!(
        client.end_session().await,
        SubmitOutcome::Dispatched(DispatchOutcome::Completed)
    );
}

#[tokio::test]
async fn test_poll_failure_leaves_state_untouched() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;
    let before = client.snapshot().await;

    server.push_update(Err(ClientError::MalformedResponse {
        endpoint: "http://127.0.0.1:42345/update".to_string(),
        message: "expected value".to_string(),
    }));
    let err = client.poller().poll().await.unwrap_err();
    assert!(err.is_remote());
    assert_eq!(client.snapshot().await, before);

    // Retry resumes from the same cursor
    client.poller().poll().await.unwrap();
    assert_eq!(server.update_requests()[2], UpdateRequest::get_info(5, 1));
}

#[tokio::test]
async fn test_blank_submission_sends_nothing() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());

    let outcome = client
        .submit(InputSubmission::new("   ", InputMode::Ask, "Mia"))
        .await;
    assert_eq!(outcome, SubmitOutcome::Empty);
    assert!(server.commands().is_empty());
}

#[tokio::test]
async fn test_submission_waits_for_busy_agent() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    server.push_update(Ok(update_for(5, true, Some("Q1"), &[])));
    client.poller().poll().await.unwrap();

    let outcome = client
        .submit(InputSubmission::new("Is it the soup?", InputMode::Answer, "Mia"))
        .await;
    assert_eq!(outcome, SubmitOutcome::AgentBusy);
    assert!(outcome.keeps_input());
    assert!(server.commands().is_empty());
}

#[tokio::test]
async fn test_busy_agent_does_not_block_when_disabled() {
    let server = Arc::new(FakeServer::default());
    let config = ClientConfig::default().with_block_while_agent_busy(false);
    let client = SyncClient::new(server.clone(), config);
    server.push_update(Ok(update_for(5, true, Some("Q1"), &[])));
    client.poller().poll().await.unwrap();

    let outcome = client
        .submit(InputSubmission::new("Is it the soup?", InputMode::Answer, "Mia"))
        .await;
    assert_eq!(outcome, SubmitOutcome::Dispatched(DispatchOutcome::Completed));
    assert_eq!(
        server.commands(),
        vec![CommandRequest::answer("Is it the soup?", "Mia")]
    );
}

#[tokio::test]
async fn test_blank_speaker_falls_back_to_default() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());

    client
        .submit(InputSubmission::new("  Was it raining?  ", InputMode::Ask, "  "))
        .await;
    assert_eq!(
        server.commands(),
        vec![CommandRequest::ask("Was it raining?", "Anonymous player")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_client_polls_until_shutdown() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());

    client.start();
    client.start();
    assert!(client.is_polling());

    tokio::time::sleep(Duration::from_millis(350)).await;
    let polled = server.update_requests().len();
    assert!(polled >= 3, "expected at least 3 polls, got {polled}");
    assert_eq!(client.snapshot().await.session.id, 1);

    client.shutdown().await;
    assert!(!client.is_polling());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.update_requests().len(), polled);
}

#[tokio::test(start_paused = true)]
async fn test_poll_loop_keeps_going_after_failures() {
    let server = Arc::new(FakeServer::default());
    let client = client_with(server.clone());
    observe_first_game(&client, &server).await;

    server.push_update(Err(ClientError::Transport {
        endpoint: "http://127.0.0.1:42345/update".to_string(),
        message: "connection reset".to_string(),
    }));
    server.push_update(Err(ClientError::MalformedResponse {
        endpoint: "http://127.0.0.1:42345/update".to_string(),
        message: "expected value".to_string(),
    }));
    server.push_update(Ok(update_for(5, false, Some("Q1"), &[("B", "Was it night?")])));

    client.start();
    tokio::time::sleep(Duration::from_millis(350)).await;
    client.shutdown().await;

    let requests = server.update_requests();
    assert!(requests.len() >= 5, "expected at least 5 polls, got {}", requests.len());
    // Both failed attempts and the retry after them ask for the same thing
    assert_eq!(requests[1..4].to_vec(), vec![UpdateRequest::get_info(5, 1); 3]);
    assert_eq!(requests[4], UpdateRequest::get_info(5, 2));

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.cursor, 2);
    assert_eq!(
        snapshot.history.last(),
        Some(&ChatMessage::server("B", "Was it night?"))
    );
}

#[tokio::test]
async fn test_config_file_with_partial_keys() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "server_url = \"http://soup.example:9000\"\nspeaker_name = \"Mia\"\n",
    )
    .unwrap();

    let config = ClientConfig::from_file(&path).await.unwrap();
    assert_eq!(config.server_url, "http://soup.example:9000");
    assert_eq!(config.effective_speaker(), "Mia");
    assert_eq!(config.poll_interval_ms, 100);
    assert!(config.block_while_agent_busy);
}

#[tokio::test]
async fn test_missing_explicit_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nope.toml");

    let err = ClientConfig::load(Some(path.as_path())).await.unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

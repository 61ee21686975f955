//! Soup CLI
//!
//! Joins a shared turtle-soup room: watch the puzzle and the chat, ask
//! questions, propose answers, start and end games.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use soup_client::chat_log::ChatMessage;
use soup_client::config::config_dir;
use soup_client::tui::{
    confirm_prompt, needs_confirmation, parse_line, App, ConfirmGuard, GameCommand, ParsedLine,
};
use soup_client::{
    ClientConfig, DispatchOutcome, HttpRemoteClient, InputMode, InputSubmission, PeriodicTask,
    StateSnapshot, SubmitOutcome, SyncClient,
};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Soup - play turtle soup with everyone in the room
#[derive(Parser, Debug)]
#[command(name = "soup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Game server base URL
    #[arg(long)]
    server: Option<String>,

    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Your speaker name
    #[arg(short, long)]
    name: Option<String>,

    /// Delay between polls in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Verbose output: log every poll
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI and use plain text mode
    #[arg(long)]
    no_tui: bool,
}

impl Cli {
    fn apply_overrides(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(server) = &self.server {
            config = config.with_server_url(server.clone());
        }
        if let Some(name) = &self.name {
            config = config.with_speaker_name(name.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            config = config.with_poll_interval_ms(ms);
        }
        config
    }

    fn log_filter(&self) -> EnvFilter {
        let default = if self.verbose { "debug" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.no_tui {
        tracing_subscriber::fmt()
            .with_env_filter(cli.log_filter())
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    } else {
        init_file_logging(&cli);
    }

    let config = ClientConfig::load(cli.config.as_deref()).await?;
    let config = cli.apply_overrides(config);
    config.validate()?;

    let remote = Arc::new(HttpRemoteClient::new(&config.server_url)?);
    let client = Arc::new(SyncClient::new(remote, config));
    client.start();

    let result = if cli.no_tui {
        run_plain_mode(client.clone()).await
    } else {
        run_tui_mode(client.clone()).await
    };

    client.shutdown().await;
    result
}

/// The TUI owns the terminal, so logs go to a file next to the config.
fn init_file_logging(cli: &Cli) {
    let Some(dir) = config_dir() else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("soup.log"))
    else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

async fn run_tui_mode(client: Arc<SyncClient>) -> anyhow::Result<()> {
    info!("Starting soup (TUI mode)");
    let mut app = App::new(client).await?;
    app.run().await?;
    Ok(())
}

/// What plain mode has already written to stdout
#[derive(Debug, Default)]
struct PrintedView {
    game_id: Option<i64>,
    puzzle: Option<String>,
    lines: usize,
}

impl PrintedView {
    /// Lines to print for the new snapshot. A transcript reset reprints from the top.
    fn catch_up(&mut self, snapshot: &StateSnapshot) -> Vec<String> {
        let mut out = Vec::new();

        let game_id = snapshot.session.is_observed().then_some(snapshot.session.id);
        if game_id != self.game_id || snapshot.history.len() < self.lines {
            self.game_id = game_id;
            self.lines = 0;
        }

        if snapshot.session.puzzle != self.puzzle {
            self.puzzle = snapshot.session.puzzle.clone();
            match &self.puzzle {
                Some(puzzle) => out.push(format!("== Puzzle: {puzzle}")),
                None => out.push("== No game in progress".to_string()),
            }
        }

        out.extend(snapshot.history[self.lines..].iter().map(format_message));
        self.lines = snapshot.history.len();
        out
    }
}

fn format_message(msg: &ChatMessage) -> String {
    if msg.is_system() {
        format!("-- {}", msg.content)
    } else {
        format!("[{}] {}", msg.speaker, msg.content)
    }
}

fn describe_outcome(outcome: &SubmitOutcome) -> Option<String> {
    match outcome {
        SubmitOutcome::Empty => None,
        SubmitOutcome::AgentBusy => Some("Please wait for the AI to reply".to_string()),
        SubmitOutcome::Dispatched(DispatchOutcome::Busy) => {
            Some("Command in progress, please wait".to_string())
        }
        SubmitOutcome::Dispatched(DispatchOutcome::Failed) => {
            Some("Could not reach the server".to_string())
        }
        // Rejections already appear in the transcript as system lines
        SubmitOutcome::Dispatched(_) => None,
    }
}

/// What a plain-mode line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlainAction {
    Quit,
    Print(String),
    StartGame,
    EndGame,
    Submit(InputSubmission),
}

/// Line-mode input state: current mode, speaker and pending confirmation
#[derive(Debug)]
struct PlainInput {
    mode: InputMode,
    speaker: String,
    confirm: ConfirmGuard,
}

impl PlainInput {
    fn new(speaker: impl Into<String>) -> Self {
        Self {
            mode: InputMode::Ask,
            speaker: speaker.into(),
            confirm: ConfirmGuard::new(),
        }
    }

    fn handle(&mut self, line: &str, puzzle_running: bool, now: Instant) -> PlainAction {
        match parse_line(line) {
            ParsedLine::Command(GameCommand::Quit, _) => PlainAction::Quit,
            ParsedLine::Command(cmd @ (GameCommand::New | GameCommand::End), _) => {
                let guarded = needs_confirmation(cmd, puzzle_running);
                if !self.confirm.check(cmd, guarded, now) {
                    return PlainAction::Print(confirm_prompt(cmd).to_string());
                }
                match cmd {
                    GameCommand::New => PlainAction::StartGame,
                    _ => PlainAction::EndGame,
                }
            }
            ParsedLine::Command(GameCommand::Ask, _) => {
                self.mode = InputMode::Ask;
                PlainAction::Print(format!("Mode: {}", self.mode.label()))
            }
            ParsedLine::Command(GameCommand::Answer, _) => {
                self.mode = InputMode::Answer;
                PlainAction::Print(format!("Mode: {}", self.mode.label()))
            }
            ParsedLine::Command(GameCommand::Name, name) => {
                if !name.is_empty() {
                    self.speaker = name;
                }
                PlainAction::Print(format!("Speaking as {}", self.speaker))
            }
            ParsedLine::Command(GameCommand::Help, _) => {
                PlainAction::Print(GameCommand::help_lines().join("\n"))
            }
            ParsedLine::Text(text) => PlainAction::Submit(InputSubmission::new(
                text,
                self.mode,
                self.speaker.clone(),
            )),
        }
    }
}

async fn run_plain_mode(client: Arc<SyncClient>) -> anyhow::Result<()> {
    info!("Starting soup (plain mode)");
    info!("Server: {}", client.config().server_url);

    let mut input = PlainInput::new(client.config().effective_speaker());
    println!(
        "Type /help for commands. Speaking as {}, mode {}.",
        input.speaker,
        input.mode.label()
    );

    // Spawn blocking task to read from stdin
    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    let view = Arc::new(tokio::sync::Mutex::new(PrintedView::default()));
    let printer = {
        let client = client.clone();
        let view = view.clone();
        PeriodicTask::spawn("printer", client.config().ui_refresh_interval(), move || {
            let client = client.clone();
            let view = view.clone();
            async move {
                let snapshot = client.snapshot().await;
                let lines = view.lock().await.catch_up(&snapshot);
                let mut stdout = io::stdout().lock();
                for line in lines {
                    if let Err(e) = writeln!(stdout, "{}", line) {
                        error!("Error writing stdout: {}", e);
                        return;
                    }
                }
                let _ = stdout.flush();
            }
        })
    };

    // Commands run on their own tasks so a stalled server never blocks input
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<String>();

    loop {
        let line = tokio::select! {
            line = line_rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
            Some(notice) = notice_rx.recv() => {
                println!("{notice}");
                continue;
            }
            _ = tokio::signal::ctrl_c() => break,
        };

        let puzzle_running = client.snapshot().await.session.has_puzzle();
        let action = input.handle(&line, puzzle_running, Instant::now());
        let client = client.clone();
        let task = match action {
            PlainAction::Quit => break,
            PlainAction::Print(text) => {
                println!("{text}");
                continue;
            }
            PlainAction::StartGame => tokio::spawn(async move { client.start_session().await }),
            PlainAction::EndGame => tokio::spawn(async move { client.end_session().await }),
            PlainAction::Submit(submission) => {
                tokio::spawn(async move { client.submit(submission).await })
            }
        };

        let notice_tx = notice_tx.clone();
        tokio::spawn(async move {
            if let Ok(outcome) = task.await {
                if let Some(notice) = describe_outcome(&outcome) {
                    let _ = notice_tx.send(notice);
                }
            }
        });
    }

    printer.stop().await;
    Ok(())
}

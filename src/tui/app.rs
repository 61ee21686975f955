//! Main TUI application
//!
//! A projection over `SyncClient`: every refresh takes a fresh snapshot,
//! and user actions are handed to the client on background tasks so a slow
//! server never freezes the screen.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::chat_log::ChatMessage;
use crate::client::SyncClient;
use crate::dispatcher::{DispatchOutcome, InputMode, InputSubmission, SubmitOutcome};
use crate::state::StateSnapshot;

use super::input::{InputAction, InputState};
use super::slash_commands::{
    confirm_prompt, needs_confirmation, parse_line, ConfirmGuard, GameCommand, ParsedLine,
};
use super::theme::Theme;
use super::widgets::{render_message_lines, HeaderBar, HelpBar, InputBox, PuzzlePanel, StatusBar};

/// How long a notice stays in the status bar
const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Result of a background command, reported back to the UI loop
#[derive(Debug)]
enum CommandReport {
    Game(SubmitOutcome),
    Submitted { text: String, outcome: SubmitOutcome },
}

pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    client: Arc<SyncClient>,
    input: InputState,
    mode: InputMode,
    speaker_name: String,
    snapshot: StateSnapshot,
    scroll_offset: usize,
    spinner_frame: usize,
    should_quit: bool,
    /// Transient feedback shown in the status bar
    notice: Option<(String, Instant)>,
    confirm: ConfirmGuard,
    /// Help lines shown locally; never part of the shared transcript
    local_lines: Vec<ChatMessage>,
    report_tx: mpsc::UnboundedSender<CommandReport>,
    report_rx: mpsc::UnboundedReceiver<CommandReport>,
}

impl App {
    pub async fn new(client: Arc<SyncClient>) -> io::Result<Self> {
        let speaker_name = client.config().effective_speaker().to_string();
        let snapshot = client.snapshot().await;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let (report_tx, report_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            client,
            input: InputState::new(),
            mode: InputMode::Ask,
            speaker_name,
            snapshot,
            scroll_offset: 0,
            spinner_frame: 0,
            should_quit: false,
            notice: None,
            confirm: ConfirmGuard::new(),
            local_lines: Vec::new(),
            report_tx,
            report_rx,
        })
    }

    /// Run the main event loop until the user quits.
    pub async fn run(&mut self) -> io::Result<()> {
        let poll_timeout = Duration::from_millis(16);
        let refresh_interval = self.client.config().ui_refresh_interval();
        let mut last_refresh = Instant::now() - refresh_interval;

        while !self.should_quit {
            if last_refresh.elapsed() >= refresh_interval {
                self.snapshot = self.client.snapshot().await;
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                last_refresh = Instant::now();
            }

            self.drain_reports();
            self.expire_transients();
            self.draw()?;

            if event::poll(poll_timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        let action = self.input.handle_key(key);
                        self.handle_action(action);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_action(&mut self, action: InputAction) {
        match action {
            InputAction::None => {}
            InputAction::Quit => self.should_quit = true,
            InputAction::ToggleMode => self.mode = self.mode.toggled(),
            InputAction::NewGame => self.request_game_command(GameCommand::New),
            InputAction::EndGame => self.request_game_command(GameCommand::End),
            InputAction::ScrollUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(3);
            }
            InputAction::ScrollDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(3);
            }
            InputAction::Escape => {
                self.confirm.clear();
                self.notice = None;
            }
            InputAction::Submit(line) => self.handle_line(line),
        }
    }

    fn handle_line(&mut self, line: String) {
        match parse_line(&line) {
            ParsedLine::Command(cmd @ (GameCommand::New | GameCommand::End), _) => {
                self.request_game_command(cmd)
            }
            ParsedLine::Command(GameCommand::Ask, _) => self.mode = InputMode::Ask,
            ParsedLine::Command(GameCommand::Answer, _) => self.mode = InputMode::Answer,
            ParsedLine::Command(GameCommand::Name, name) => {
                if name.is_empty() {
                    self.set_notice(format!("Your name is {}", self.speaker_name));
                } else {
                    self.speaker_name = name;
                }
            }
            ParsedLine::Command(GameCommand::Help, _) => {
                self.local_lines = GameCommand::help_lines()
                    .into_iter()
                    .map(ChatMessage::system)
                    .collect();
            }
            ParsedLine::Command(GameCommand::Quit, _) => self.should_quit = true,
            ParsedLine::Text(text) => self.submit_text(text),
        }
    }

    fn submit_text(&mut self, text: String) {
        if self.client.is_command_in_flight() {
            self.input.restore(&text);
            self.set_notice("Command in progress, please wait");
            return;
        }
        if self.snapshot.session.agent_busy && self.client.config().block_while_agent_busy {
            self.input.restore(&text);
            self.set_notice("Please wait for the AI to reply");
            return;
        }

        let submission = InputSubmission::new(text.clone(), self.mode, self.speaker_name.clone());
        let client = self.client.clone();
        let tx = self.report_tx.clone();
        tokio::spawn(async move {
            let outcome = client.submit(submission).await;
            let _ = tx.send(CommandReport::Submitted { text, outcome });
        });
    }

    /// New/end game need a second press while it would interrupt other players.
    fn request_game_command(&mut self, command: GameCommand) {
        let guarded = needs_confirmation(command, self.snapshot.session.has_puzzle());
        if !self.confirm.check(command, guarded, Instant::now()) {
            self.set_notice(confirm_prompt(command));
            return;
        }

        self.notice = None;
        let client = self.client.clone();
        let tx = self.report_tx.clone();
        tokio::spawn(async move {
            let outcome = match command {
                GameCommand::New => client.start_session().await,
                _ => client.end_session().await,
            };
            let _ = tx.send(CommandReport::Game(outcome));
        });
    }

    fn drain_reports(&mut self) {
        while let Ok(report) = self.report_rx.try_recv() {
            debug!("Command report: {:?}", report);
            match report {
                CommandReport::Game(SubmitOutcome::AgentBusy) => {
                    self.set_notice("Please wait for the AI to reply");
                }
                CommandReport::Game(SubmitOutcome::Dispatched(DispatchOutcome::Busy)) => {
                    self.set_notice("Command in progress, please wait");
                }
                CommandReport::Game(_) => {}
                CommandReport::Submitted { text, outcome } => {
                    if outcome.keeps_input() {
                        self.input.restore(&text);
                        self.set_notice(match outcome {
                            SubmitOutcome::AgentBusy => "Please wait for the AI to reply",
                            _ => "Command in progress, please wait",
                        });
                    } else {
                        self.scroll_offset = 0;
                    }
                }
            }
        }
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
    }

    fn expire_transients(&mut self) {
        self.confirm.expire(Instant::now());
        if matches!(self.notice, Some((_, at)) if at.elapsed() > NOTICE_TTL) {
            self.notice = None;
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let snapshot = &self.snapshot;
        let input = &self.input;
        let mode = self.mode;
        let speaker_name = self.speaker_name.as_str();
        let scroll_offset = self.scroll_offset;
        let spinner_frame = self.spinner_frame;
        let notice = self.notice.as_ref().map(|(text, _)| text.as_str());
        let local_lines = &self.local_lines;
        let server = self.client.config().server_url.as_str();

        self.terminal.draw(|f| {
            let size = f.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Header
                    Constraint::Length(5), // Puzzle
                    Constraint::Min(6),    // Transcript
                    Constraint::Length(1), // Status
                    Constraint::Length(3), // Input
                    Constraint::Length(1), // Help
                ])
                .split(size);

            f.render_widget(
                HeaderBar {
                    server,
                    game_id: snapshot.session.is_observed().then_some(snapshot.session.id),
                    agent_busy: snapshot.session.agent_busy,
                    spinner_frame,
                    last_synced_at: snapshot.last_synced_at,
                },
                chunks[0],
            );

            f.render_widget(
                PuzzlePanel {
                    puzzle: snapshot.session.puzzle.as_deref(),
                },
                chunks[1],
            );

            Self::render_transcript(
                f,
                chunks[2],
                snapshot.history.iter().chain(local_lines.iter()),
                speaker_name,
                scroll_offset,
            );

            f.render_widget(
                StatusBar {
                    command_in_flight: snapshot.command_in_flight,
                    spinner_frame,
                    notice,
                },
                chunks[3],
            );

            f.render_widget(
                InputBox {
                    content: &input.buffer,
                    mode,
                    speaker: speaker_name,
                },
                chunks[4],
            );

            let cursor_x = chunks[4].x + 1 + input.cursor_display_width() as u16;
            f.set_cursor_position((
                cursor_x.min(chunks[4].x + chunks[4].width.saturating_sub(2)),
                chunks[4].y + 1,
            ));

            f.render_widget(HelpBar, chunks[5]);
        })?;

        Ok(())
    }

    fn render_transcript<'m>(
        f: &mut Frame,
        area: Rect,
        messages: impl Iterator<Item = &'m ChatMessage>,
        own_name: &str,
        scroll_offset: usize,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::panel_border())
            .title_top(Line::styled(" Chat ", Theme::panel_title()));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let width = inner.width as usize;
        let all_lines: Vec<Line> = messages
            .flat_map(|msg| render_message_lines(msg, own_name, width))
            .collect();

        // Stick to the bottom unless the user scrolled up
        let total_lines = all_lines.len();
        let visible_height = inner.height as usize;
        let max_scroll = total_lines.saturating_sub(visible_height);
        let actual_scroll = scroll_offset.min(max_scroll);
        let start = max_scroll - actual_scroll;

        let visible: Vec<Line> = all_lines
            .into_iter()
            .skip(start)
            .take(visible_height)
            .collect();
        f.render_widget(Paragraph::new(visible), inner);

        if total_lines > visible_height {
            let mut scrollbar_state =
                ScrollbarState::new(max_scroll).position(max_scroll - actual_scroll);
            f.render_stateful_widget(
                Scrollbar::new(ScrollbarOrientation::VerticalRight),
                area.inner(ratatui::layout::Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

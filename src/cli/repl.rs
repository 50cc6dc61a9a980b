use crate::chat::controller::{ControllerEvent, CycleOutcome, SubmitError, TurnController};
use crate::chat::session::ChatSession;
use crate::chat::transcript::{Transcript, Turn};
use crate::cli::commands::{
    ABOUT_TEXT, Command, HELP_TEXT, is_command_line, is_exit_word, parse_command,
};
use crate::cli::theme::Theme;
use crate::cli::timeline::Timeline;
use crate::config::ThemeToken;
use crate::llm::ollama::{OllamaProvider, is_installed};
use crate::trace::SessionTrace;
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

const TITLE: &str = "🧠 DeepSeek Code Buddy";
const CAPTION: &str = "🚀 Your AI Pair Programmer with Debugging Superpowers";
const INPUT_PROMPT: &str = "> ";
const BUSY_INPUT_HINT: &str = "waiting for the model...";
const IDLE_POLL: Duration = Duration::from_millis(250);
const SPINNER_INTERVAL: Duration = Duration::from_millis(100);
const WHEEL_STEP: usize = 3;

pub struct AppState {
    session: ChatSession,
    controller: TurnController<OllamaProvider>,
    trace: SessionTrace,
    theme: Theme,
    session_id: String,
    timeline: Timeline,
    input: InputLine,
    scroll_back: usize,
    page_height: usize,
    should_exit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyAction {
    None,
    Submit(String),
    Exit,
}

/// Terminal events that arrive while a cycle is in flight. They are drained
/// and dropped so nothing typed during processing leaks into the next input.
pub(crate) trait PendingInput {
    fn discard_pending(&mut self) -> Result<usize>;
}

struct CrosstermInput;

impl PendingInput for CrosstermInput {
    fn discard_pending(&mut self) -> Result<usize> {
        let mut discarded = 0;
        while event::poll(Duration::ZERO)? {
            event::read()?;
            discarded += 1;
        }
        Ok(discarded)
    }
}

impl AppState {
    pub fn new(
        session: ChatSession,
        controller: TurnController<OllamaProvider>,
        trace: SessionTrace,
        theme: Theme,
        session_id: String,
    ) -> Self {
        Self {
            session,
            controller,
            trace,
            theme,
            session_id,
            timeline: Timeline::new(),
            input: InputLine::default(),
            scroll_back: 0,
            page_height: 1,
            should_exit: false,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => KeyAction::Exit,
            KeyCode::Char(_) if ctrl => KeyAction::None,
            KeyCode::Char(ch) => {
                self.input.insert(ch);
                KeyAction::None
            }
            KeyCode::Enter => {
                let line = self.input.take();
                if is_exit_word(&line) {
                    KeyAction::Exit
                } else {
                    KeyAction::Submit(line)
                }
            }
            KeyCode::Tab => {
                let model = self.session.cycle_model().name().to_string();
                self.trace.log_model_change(&model);
                KeyAction::None
            }
            KeyCode::Backspace => {
                self.input.backspace();
                KeyAction::None
            }
            KeyCode::Left => {
                self.input.move_left();
                KeyAction::None
            }
            KeyCode::Right => {
                self.input.move_right();
                KeyAction::None
            }
            KeyCode::Home => {
                self.input.home();
                KeyAction::None
            }
            KeyCode::End => {
                self.input.end();
                KeyAction::None
            }
            KeyCode::Esc => {
                self.input.clear();
                KeyAction::None
            }
            KeyCode::PageUp => {
                self.scroll_back = self
                    .scroll_back
                    .saturating_add(self.page_height.saturating_sub(1).max(1));
                KeyAction::None
            }
            KeyCode::PageDown => {
                self.scroll_back = self
                    .scroll_back
                    .saturating_sub(self.page_height.saturating_sub(1).max(1));
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    pub(crate) fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.scroll_back = self.scroll_back.saturating_add(WHEEL_STEP);
            }
            MouseEventKind::ScrollDown => {
                self.scroll_back = self.scroll_back.saturating_sub(WHEEL_STEP);
            }
            _ => {}
        }
    }

    /// Dispatches one submitted line: slash commands stay local, anything else
    /// goes through the turn controller.
    pub(crate) async fn submit_line<B: Backend, I: PendingInput>(
        &mut self,
        terminal: &mut Terminal<B>,
        pending_input: &mut I,
        line: &str,
    ) -> Result<()> {
        if !line.trim().is_empty() {
            self.timeline.clear_notices();
        }

        if is_command_line(line) {
            self.run_command(line).await;
            self.scroll_back = 0;
            return Ok(());
        }

        self.run_cycle(terminal, pending_input, line).await
    }

    async fn run_cycle<B: Backend, I: PendingInput>(
        &mut self,
        terminal: &mut Terminal<B>,
        pending_input: &mut I,
        line: &str,
    ) -> Result<()> {
        let mut preview = self.session.transcript().clone();
        let pending = preview.append(Turn::user(line.trim())).is_ok();
        if pending {
            self.trace.log_user_input(line.trim());
        }
        let model = self.session.model().name().to_string();
        self.scroll_back = 0;

        let mut discarded = 0;
        let result = {
            let trace = &self.trace;
            let mut on_event = |event: ControllerEvent| match event {
                ControllerEvent::StateChanged(state) => {
                    trace.log_session(&format!("controller state: {state:?}"));
                }
                ControllerEvent::Notification(text) => trace.log_assistant_error(&text),
            };
            let cycle = self
                .controller
                .submit(&mut self.session, line, &mut on_event);
            tokio::pin!(cycle);

            let mut ticker = tokio::time::interval(SPINNER_INTERVAL);
            let mut tick = 0;
            loop {
                tokio::select! {
                    result = &mut cycle => break result,
                    _ = ticker.tick() => {
                        if pending {
                            let view = ScreenView {
                                transcript: &preview,
                                timeline: &self.timeline,
                                theme: &self.theme,
                                input: &self.input,
                                model: &model,
                                session_id: &self.session_id,
                                scroll_back: 0,
                                busy_tick: Some(tick),
                            };
                            terminal.draw(|frame| {
                                render(frame, &view);
                            })?;
                        }
                        discarded += pending_input.discard_pending()?;
                        tick += 1;
                    }
                }
            }
        };

        if discarded > 0 {
            self.trace.log_session(&format!(
                "discarded {discarded} terminal events while processing"
            ));
        }

        match result {
            Ok(CycleOutcome::Appended { reply }) => self.trace.log_assistant_output(&reply),
            Ok(CycleOutcome::Failed { notification, .. }) => {
                self.timeline.push_error(&notification);
            }
            Err(SubmitError::EmptyInput) => {}
        }

        Ok(())
    }

    async fn run_command(&mut self, line: &str) {
        self.trace.log_command(line);
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(err) => {
                self.command_error(err.message());
                return;
            }
        };

        match command {
            Command::Help => self.command_info(HELP_TEXT),
            Command::About => self.command_info(ABOUT_TEXT),
            Command::Model(None) => {
                let message = format!(
                    "Current model: {}\nAllowed models: {}",
                    self.session.model(),
                    self.session.catalog().names().join(", ")
                );
                self.command_info(&message);
            }
            Command::Model(Some(name)) => match self.session.select_model(&name) {
                Ok(selector) => {
                    let model = selector.name().to_string();
                    self.trace.log_model_change(&model);
                    self.command_info(&format!("Switched model to {model}"));
                }
                Err(err) => self.command_error(&err.to_string()),
            },
            Command::Models => match self.controller.client().list_models().await {
                Ok(installed) => {
                    let message = models_report(
                        self.session.catalog().names(),
                        &installed,
                        self.session.model().name(),
                    );
                    self.command_info(&message);
                }
                Err(err) => {
                    self.command_error(&format!("Could not list installed models: {err}"));
                }
            },
            Command::Clear => {
                self.session.reset();
                self.timeline.clear_notices();
                self.trace.log_session("conversation reset");
                self.command_info("Started a fresh conversation.");
            }
            Command::Trace => {
                let message = format!("Trace file: {}", self.trace.file_path().display());
                self.command_info(&message);
            }
        }
    }

    fn command_info(&mut self, text: &str) {
        self.trace.log_command_output(text);
        self.timeline.push_info(text);
    }

    fn command_error(&mut self, text: &str) {
        self.trace.log_command_output(text);
        self.timeline.push_error(text);
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let view = ScreenView {
            transcript: self.session.transcript(),
            timeline: &self.timeline,
            theme: &self.theme,
            input: &self.input,
            model: self.session.model().name(),
            session_id: &self.session_id,
            scroll_back: self.scroll_back,
            busy_tick: None,
        };
        let mut metrics = RenderMetrics::default();
        terminal.draw(|frame| metrics = render(frame, &view))?;

        self.scroll_back = self.scroll_back.min(metrics.max_scroll);
        self.page_height = metrics.page_height;
        Ok(())
    }
}

/// Allow-list annotated with what the server actually has installed.
pub fn models_report(allowed: &[String], installed: &[String], current: &str) -> String {
    let mut lines = vec!["Allowed models:".to_string()];
    for name in allowed {
        let marker = if name == current { "*" } else { " " };
        let status = if is_installed(installed, name) {
            "installed".to_string()
        } else {
            format!("not installed, run: ollama pull {name}")
        };
        lines.push(format!("{marker} {name} ({status})"));
    }
    lines.join("\n")
}

pub async fn run_repl(state: &mut AppState) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    state
        .trace
        .log_session(&format!("ui started with model {}", state.session.model()));

    loop {
        state.draw(&mut guard.terminal)?;
        if state.should_exit {
            break;
        }

        if !event::poll(IDLE_POLL)? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match state.handle_key(key) {
                KeyAction::None => {}
                KeyAction::Submit(line) => {
                    state
                        .submit_line(&mut guard.terminal, &mut CrosstermInput, &line)
                        .await?;
                }
                KeyAction::Exit => state.should_exit = true,
            },
            Event::Mouse(mouse) => state.handle_mouse(mouse),
            _ => {}
        }
    }

    state.trace.log_session("ui stopped");
    Ok(())
}

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw terminal mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(err).context("failed to enter alternate screen");
        }

        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
                Err(err).context("failed to initialize terminal")
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Single-line editor state. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InputLine {
    text: String,
    cursor: usize,
}

impl InputLine {
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    fn insert(&mut self, ch: char) {
        let idx = self.byte_index(self.cursor);
        self.text.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index(self.cursor);
        self.text.remove(idx);
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    fn home(&mut self) {
        self.cursor = 0;
    }

    fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

pub(crate) struct ScreenLayout {
    pub(crate) header: Rect,
    pub(crate) timeline: Rect,
    pub(crate) input: Rect,
    pub(crate) status: Rect,
}

pub(crate) fn screen_layout(area: Rect) -> ScreenLayout {
    let [header, timeline, input, status] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    ScreenLayout {
        header,
        timeline,
        input,
        status,
    }
}

struct ScreenView<'a> {
    transcript: &'a Transcript,
    timeline: &'a Timeline,
    theme: &'a Theme,
    input: &'a InputLine,
    model: &'a str,
    session_id: &'a str,
    scroll_back: usize,
    busy_tick: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RenderMetrics {
    max_scroll: usize,
    page_height: usize,
}

fn render(frame: &mut Frame<'_>, view: &ScreenView<'_>) -> RenderMetrics {
    let layout = screen_layout(frame.area());
    let theme = view.theme;

    frame.render_widget(
        Paragraph::new(vec![
            Line::styled(TITLE, theme.style(ThemeToken::Title)),
            Line::styled(CAPTION, theme.style(ThemeToken::Caption)),
        ]),
        layout.header,
    );

    let lines = view.timeline.render_lines(
        view.transcript,
        theme,
        layout.timeline.width,
        view.busy_tick,
    );
    let page_height = usize::from(layout.timeline.height);
    let max_scroll = lines.len().saturating_sub(page_height);
    let top = max_scroll - view.scroll_back.min(max_scroll);
    frame.render_widget(
        Paragraph::new(lines).scroll((u16::try_from(top).unwrap_or(u16::MAX), 0)),
        layout.timeline,
    );

    render_input(frame, view, layout.input);

    let status = format!(
        " codebuddy | model: {} (Tab to switch) | session: {} | /help",
        view.model, view.session_id
    );
    frame.render_widget(
        Paragraph::new(Line::styled(status, theme.style(ThemeToken::Status))),
        layout.status,
    );

    RenderMetrics {
        max_scroll,
        page_height,
    }
}

fn render_input(frame: &mut Frame<'_>, view: &ScreenView<'_>, area: Rect) {
    let theme = view.theme;
    let block_style = theme.style(ThemeToken::InputBlock);

    if view.busy_tick.is_some() {
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(INPUT_PROMPT, theme.style(ThemeToken::UserPrompt)),
                Span::styled(BUSY_INPUT_HINT, theme.style(ThemeToken::SystemInfo)),
            ]))
            .style(block_style),
            area,
        );
        return;
    }

    let prompt_width = INPUT_PROMPT.chars().count();
    let visible = usize::from(area.width).saturating_sub(prompt_width).max(1);
    let first_visible = (view.input.cursor() + 1).saturating_sub(visible);
    let shown: String = view
        .input
        .text()
        .chars()
        .skip(first_visible)
        .take(visible)
        .collect();

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(INPUT_PROMPT, theme.style(ThemeToken::UserPrompt)),
            Span::styled(shown, block_style),
        ]))
        .style(block_style),
        area,
    );

    let cursor_offset = prompt_width + view.input.cursor() - first_visible;
    let cursor_x = area
        .x
        .saturating_add(u16::try_from(cursor_offset).unwrap_or(u16::MAX));
    frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
}

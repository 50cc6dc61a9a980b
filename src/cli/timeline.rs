use crate::chat::transcript::{Role, Transcript, Turn};
use crate::cli::theme::Theme;
use crate::config::ThemeToken;
use ratatui::text::{Line, Span};

const USER_PREFIX: &str = "you> ";
const ASSISTANT_PREFIX: &str = "ai> ";
const BUSY_LABEL: &str = "🧠 Processing...";
const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notice {
    kind: NoticeKind,
    text: String,
}

/// UI-only lines shown under the transcript: command output and failure
/// notifications. They never become turns.
#[derive(Debug, Clone, Default)]
pub(crate) struct Timeline {
    notices: Vec<Notice>,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_info(&mut self, text: &str) {
        self.push(NoticeKind::Info, text);
    }

    pub(crate) fn push_error(&mut self, text: &str) {
        self.push(NoticeKind::Error, text);
    }

    fn push(&mut self, kind: NoticeKind, text: &str) {
        self.notices.push(Notice {
            kind,
            text: text.to_string(),
        });
    }

    pub(crate) fn clear_notices(&mut self) {
        self.notices.clear();
    }

    #[cfg(test)]
    pub(crate) fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Flattens transcript, notices and the busy indicator into display lines
    /// already wrapped to `width` columns.
    pub(crate) fn render_lines(
        &self,
        transcript: &Transcript,
        theme: &Theme,
        width: u16,
        busy_tick: Option<usize>,
    ) -> Vec<Line<'static>> {
        let context = RenderContext {
            theme,
            width: usize::from(width.max(1)),
        };
        let mut lines = Vec::new();
        for turn in transcript.all() {
            TurnWidget { turn }.render(&context, &mut lines);
        }
        for notice in &self.notices {
            NoticeWidget { notice }.render(&context, &mut lines);
        }
        if let Some(tick) = busy_tick {
            BusyWidget { tick }.render(&context, &mut lines);
        }

        lines
    }
}

trait TimelineWidget {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>);
}

struct RenderContext<'a> {
    theme: &'a Theme,
    width: usize,
}

struct TurnWidget<'a> {
    turn: &'a Turn,
}

impl TimelineWidget for TurnWidget<'_> {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        let (prefix, prefix_token, text_token) = match self.turn.role() {
            Role::User => (USER_PREFIX, ThemeToken::UserPrompt, ThemeToken::UserInput),
            Role::Assistant | Role::System => (
                ASSISTANT_PREFIX,
                ThemeToken::AssistantPrompt,
                ThemeToken::AssistantText,
            ),
        };
        let prefix_width = prefix.chars().count();
        let indent = " ".repeat(prefix_width);
        let body_width = context.width.saturating_sub(prefix_width).max(1);
        let prefix_style = context.theme.style(prefix_token);
        let text_style = context.theme.style(text_token);

        let mut first = true;
        for source_line in split_output_lines(self.turn.content()) {
            for chunk in wrap_line(source_line, body_width) {
                let lead = if first {
                    Span::styled(prefix, prefix_style)
                } else {
                    Span::raw(indent.clone())
                };
                first = false;
                lines.push(Line::from(vec![lead, Span::styled(chunk, text_style)]));
            }
        }
        lines.push(Line::from(""));
    }
}

struct NoticeWidget<'a> {
    notice: &'a Notice,
}

impl TimelineWidget for NoticeWidget<'_> {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        let style = context.theme.style(match self.notice.kind {
            NoticeKind::Info => ThemeToken::SystemInfo,
            NoticeKind::Error => ThemeToken::SystemError,
        });
        for source_line in split_output_lines(&self.notice.text) {
            for chunk in wrap_line(source_line, context.width) {
                lines.push(Line::from(Span::styled(chunk, style)));
            }
        }
    }
}

struct BusyWidget {
    tick: usize,
}

impl TimelineWidget for BusyWidget {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        lines.push(Line::from(Span::styled(
            format!("{BUSY_LABEL} {}", spinner_frame(self.tick)),
            context.theme.style(ThemeToken::AssistantWaiting),
        )));
    }
}

pub(crate) fn spinner_frame(tick: usize) -> char {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

fn split_output_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    text.lines().collect()
}

/// Greedy word wrap on character columns. Words longer than `width` are split
/// hard; an empty line stays a single empty chunk.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut started = false;

    for word in line.split(' ') {
        let word_len = word.chars().count();
        let needed = if started {
            current_len + 1 + word_len
        } else {
            word_len
        };

        if needed <= width {
            if started {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
            started = true;
            continue;
        }

        if started {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        let mut chars = word.chars().peekable();
        while chars.peek().is_some() {
            let piece: String = chars.by_ref().take(width).collect();
            let piece_len = piece.chars().count();
            if piece_len == width && chars.peek().is_some() {
                chunks.push(piece);
            } else {
                current = piece;
                current_len = piece_len;
            }
        }
        started = true;
    }

    chunks.push(current);
    chunks
}

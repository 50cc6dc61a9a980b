#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Help,
    Model(Option<String>),
    Models,
    Clear,
    Trace,
    About,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParseError {
    message: String,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }
}

pub(crate) const HELP_TEXT: &str = "Available commands:\n  /help                Show this command list\n  /model [name]        Show or switch the active model\n  /models              List allowed models and whether they are installed\n  /clear               Start a fresh conversation\n  /trace               Show path to the current trace file\n  /about               Show what the assistant can help with\n  exit | quit          Leave the chat\nKeys: Enter send, Tab next model, PgUp/PgDn scroll, Esc clear input, Ctrl-C quit";

pub(crate) const ABOUT_TEXT: &str = "Model capabilities:\n  - Python Expert\n  - Debugging Assistant\n  - Code Documentation\n  - Solution Design\nBuilt with Ollama and ratatui";

pub(crate) fn parse_command(line: &str) -> Result<Command, ParseError> {
    if !line.starts_with('/') {
        return Err(ParseError::new("not a command"));
    }

    let trimmed = line.trim();
    let command_text = &trimmed[1..];
    let mut parts = command_text.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_ascii_lowercase();
    if name.is_empty() {
        return Err(ParseError::new("empty command. Try /help"));
    }
    let rest = parts.next().map(str::trim).unwrap_or("");

    match name.as_str() {
        "help" => expect_no_args(rest, Command::Help, "usage: /help"),
        "model" => Ok(Command::Model(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),
        "models" => expect_no_args(rest, Command::Models, "usage: /models"),
        "clear" => expect_no_args(rest, Command::Clear, "usage: /clear"),
        "trace" => expect_no_args(rest, Command::Trace, "usage: /trace"),
        "about" => expect_no_args(rest, Command::About, "usage: /about"),
        _ => Err(ParseError::new(format!(
            "unknown command '/{name}'. Try /help"
        ))),
    }
}

pub(crate) fn is_command_line(line: &str) -> bool {
    line.starts_with('/')
}

pub(crate) fn is_exit_word(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

fn expect_no_args(rest: &str, command: Command, usage: &str) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::new(usage))
    }
}

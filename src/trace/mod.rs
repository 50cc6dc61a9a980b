use anyhow::{Context, Result, bail};
use reqwest::header::HeaderMap;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const TRACE_SUBDIR: &str = "codebuddy/traces";
const KIND_WIDTH: usize = 11;

/// Append-only diagnostic log for one running session. Cloning shares the
/// underlying file.
#[derive(Clone)]
pub struct SessionTrace {
    file: Arc<TraceFile>,
}

struct TraceFile {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
    warned: AtomicBool,
}

impl SessionTrace {
    pub fn create(session_id: &str) -> Result<Self> {
        Self::create_in_dir(session_id, &default_trace_dir()?)
    }

    pub fn create_in_dir(session_id: &str, trace_dir: &Path) -> Result<Self> {
        fs::create_dir_all(trace_dir)
            .with_context(|| format!("Failed to create trace directory {}", trace_dir.display()))?;

        let started = OffsetDateTime::now_utc().unix_timestamp();
        let path = trace_dir.join(format!("session-{session_id}-{started}.log"));
        let file = open_owner_only(&path)
            .with_context(|| format!("Failed to create trace file {}", path.display()))?;

        Ok(Self {
            file: Arc::new(TraceFile {
                path,
                out: Mutex::new(BufWriter::new(file)),
                warned: AtomicBool::new(false),
            }),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file.path
    }

    pub fn log_session(&self, text: &str) {
        self.record_text("session", text);
    }

    pub fn log_user_input(&self, text: &str) {
        self.record_text("user.in", text);
    }

    pub fn log_assistant_output(&self, text: &str) {
        self.record_text("ai.out", text);
    }

    pub fn log_assistant_error(&self, text: &str) {
        self.record_text("ai.err", text);
    }

    pub fn log_command(&self, text: &str) {
        self.record_text("cmd.in", text);
    }

    pub fn log_command_output(&self, text: &str) {
        self.record_text("cmd.out", text);
    }

    pub fn log_model_change(&self, model: &str) {
        self.record("model", model);
    }

    pub fn log_http_request(&self, method: &str, url: &str, headers: &HeaderMap, body: &str) {
        self.record("http.req", &format!("{method} {url}"));
        self.record_headers("http.req", headers);
        if !body.is_empty() {
            self.record_text("http.req", body);
        }
    }

    pub fn log_http_response(&self, status: u16, headers: &HeaderMap, body: &str) {
        self.record("http.resp", &format!("HTTP {status}"));
        self.record_headers("http.resp", headers);
        self.record_text("http.resp", body);
    }

    pub fn log_http_error(&self, message: &str) {
        self.record("http.err", message);
    }

    fn record_headers(&self, kind: &str, headers: &HeaderMap) {
        for (name, value) in headers {
            match value.to_str() {
                Ok(value) => self.record(kind, &format!("{name}: {value}")),
                Err(_) => self.record(kind, &format!("{name}: <non-utf8>")),
            }
        }
    }

    /// Multi-line text becomes one record per line; empty text is recorded
    /// as `<empty>` so the entry is still visible.
    fn record_text(&self, kind: &str, text: &str) {
        let mut lines = text.lines().peekable();
        if lines.peek().is_none() {
            self.record(kind, "<empty>");
        }
        for line in lines {
            self.record(kind, line);
        }
    }

    fn record(&self, kind: &str, text: &str) {
        let line = format!("[{}] [{kind:<KIND_WIDTH$}] {text}\n", utc_now_millis());
        self.file.append(&line);
    }
}

impl TraceFile {
    fn append(&self, line: &str) {
        let written = match self.out.lock() {
            Ok(mut out) => out.write_all(line.as_bytes()).and_then(|()| out.flush()),
            Err(_) => Err(io::Error::other("trace writer lock poisoned")),
        };
        if let Err(err) = written {
            self.warn_once(&err);
        }
    }

    fn warn_once(&self, err: &io::Error) {
        if self.warned.swap(true, Ordering::Relaxed) {
            return;
        }
        eprintln!(
            "codebuddy: session trace {} stopped recording: {err}",
            self.path.display()
        );
    }
}

fn open_owner_only(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// RFC 3339 UTC timestamp cut to millisecond precision.
fn utc_now_millis() -> String {
    let now = OffsetDateTime::now_utc();
    let now = now
        .replace_millisecond(now.millisecond())
        .unwrap_or(now);
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

fn default_trace_dir() -> Result<PathBuf> {
    let xdg_state_home = env::var("XDG_STATE_HOME").ok();
    let state_dir = state_home(xdg_state_home.as_deref(), dirs::home_dir().as_deref())?;
    Ok(state_dir.join(TRACE_SUBDIR))
}

/// `$XDG_STATE_HOME`, falling back to `~/.local/state`. A set but blank
/// `XDG_STATE_HOME` is rejected instead of falling back.
fn state_home(xdg_state_home: Option<&str>, home_dir: Option<&Path>) -> Result<PathBuf> {
    match (xdg_state_home.map(str::trim), home_dir) {
        (Some(""), _) => bail!("Cannot place session trace: XDG_STATE_HOME is set but empty"),
        (Some(dir), _) => Ok(PathBuf::from(dir)),
        (None, Some(home)) => Ok(home.join(".local").join("state")),
        (None, None) => {
            bail!("Cannot place session trace: neither XDG_STATE_HOME nor a home directory is available")
        }
    }
}

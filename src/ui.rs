use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use std::fmt::Display;
use std::io::{self, Write};
use std::time::{Duration, Instant};

const STATUS_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Pending,
    Success,
    Info,
    Warn,
    Error,
}

impl StatusKind {
    fn style(self) -> Style {
        let style = Style::new().bold();
        let color = match self {
            StatusKind::Pending => AnsiColor::Cyan,
            StatusKind::Success => AnsiColor::Green,
            StatusKind::Info => AnsiColor::Blue,
            StatusKind::Warn => AnsiColor::Yellow,
            StatusKind::Error => AnsiColor::Red,
        };
        style.fg_color(Some(color.into()))
    }

    fn to_stderr(self) -> bool {
        matches!(self, StatusKind::Warn | StatusKind::Error)
    }
}

fn supports_color(stderr: bool) -> bool {
    let terminal = if stderr {
        io::stderr().is_terminal()
    } else {
        io::stdout().is_terminal()
    };
    terminal && std::env::var_os("NO_COLOR").is_none()
}

/// Right-align `label` in the status column; continuation lines are indented
/// to the same column
fn format_status(label: &str, message: &str, style: Option<Style>) -> String {
    let (prefix, suffix) = match style {
        Some(style) => (style.render().to_string(), style.render_reset().to_string()),
        None => (String::new(), String::new()),
    };

    let mut out = String::new();
    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            out.push_str(&format!("{prefix}{label:>STATUS_WIDTH$}{suffix} {line}\n"));
        } else {
            out.push_str(&format!("{:>STATUS_WIDTH$} {line}\n", ""));
        }
    }
    out
}

fn write_status(kind: StatusKind, label: &str, message: &str) {
    let stderr = kind.to_stderr();
    let style = supports_color(stderr).then(|| kind.style());
    let text = format_status(label, message, style);

    // Nothing useful to do if the terminal is gone
    let _ = if stderr {
        io::stderr().lock().write_all(text.as_bytes())
    } else {
        io::stdout().lock().write_all(text.as_bytes())
    };
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 60 {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    } else if duration.as_secs_f64() >= 1.0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

pub fn status(label: &str, message: impl Display) {
    write_status(StatusKind::Pending, label, &message.to_string());
}

pub fn info(message: impl Display) {
    write_status(StatusKind::Info, "Info", &message.to_string());
}

pub fn warn(message: impl Display) {
    write_status(StatusKind::Warn, "Warning", &message.to_string());
}

pub fn error(message: impl Display) {
    write_status(StatusKind::Error, "Error", &message.to_string());
}

pub fn success(label: &str, message: impl Display) {
    write_status(StatusKind::Success, label, &message.to_string());
}

/// A long-running step (fetch, push, install) reported with its duration
pub struct Progress {
    message: String,
    started: Instant,
    done: bool,
}

impl Progress {
    pub fn new(label: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        write_status(StatusKind::Pending, label, &message);
        Self {
            message,
            started: Instant::now(),
            done: false,
        }
    }

    pub fn success(mut self, label: &str, detail: impl Display) {
        self.done = true;
        let detail = detail.to_string();
        let elapsed = format_duration(self.started.elapsed());
        let message = if detail.is_empty() {
            format!("{} in {elapsed}", self.message)
        } else {
            format!("{} {detail} in {elapsed}", self.message)
        };
        write_status(StatusKind::Success, label, &message);
    }

    pub fn fail(mut self, error: impl Display) {
        self.done = true;
        let elapsed = format_duration(self.started.elapsed());
        let message = format!("{} after {elapsed}: {error}", self.message);
        write_status(StatusKind::Error, "Failed", &message);
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.done {
            write_status(StatusKind::Warn, "Aborted", &self.message);
        }
    }
}

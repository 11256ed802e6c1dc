//! Batch progress reporting.
//!
//! The dispatcher never touches a display. It emits [`BatchEvent`]s to a
//! [`BatchProgressReporter`]; the CLI picks a reporter that renders them on
//! **stderr** (human or JSON lines) so stdout remains parseable for scripts,
//! and tests or embedding front-ends can collect them through a channel.

use std::io::Write;

use tokio::sync::mpsc::UnboundedSender;

use crate::models::ItemState;

/// A single progress event for one batch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchEvent {
    /// The run is starting with `total` items in `windows` windows.
    Started { total: usize, windows: usize },
    /// Window `window` (1-based) of `windows` is being launched.
    WindowStarted {
        window: usize,
        windows: usize,
        size: usize,
    },
    /// Item `index` moved from queued to processing.
    ItemStarted { index: usize, label: String },
    /// Item `index` reached a terminal state.
    ItemSettled {
        index: usize,
        label: String,
        state: ItemState,
        message: Option<String>,
    },
    /// `completed` of `total` items have settled.
    Progress { completed: usize, total: usize },
    /// Every window has drained. Emitted exactly once per run.
    Completed {
        total: usize,
        successful: usize,
        failed: usize,
    },
}

impl BatchEvent {
    /// Completion percentage for `Progress` events.
    pub fn percent(&self) -> Option<u32> {
        match self {
            BatchEvent::Progress { completed, total } => Some(percent_of(*completed, *total)),
            _ => None,
        }
    }
}

pub fn percent_of(n: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((n as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Receives batch events. Called from the dispatcher.
pub trait BatchProgressReporter: Send + Sync {
    fn report(&self, event: BatchEvent);
}

/// Human-friendly progress on stderr: "batch  [2/5]  40%".
pub struct StderrProgress;

impl BatchProgressReporter for StderrProgress {
    fn report(&self, event: BatchEvent) {
        let line = match &event {
            BatchEvent::Started { total, windows } => {
                format!("batch  starting  {} documents in {} windows\n", total, windows)
            }
            BatchEvent::WindowStarted {
                window,
                windows,
                size,
            } => format!("batch  window {}/{}  ({} documents)\n", window, windows, size),
            BatchEvent::ItemStarted { label, .. } => format!("  processing  {}\n", label),
            BatchEvent::ItemSettled {
                label,
                state,
                message,
                ..
            } => match message {
                Some(msg) => format!("  {}  {}  ({})\n", state, label, msg),
                None => format!("  {}  {}\n", state, label),
            },
            BatchEvent::Progress { completed, total } => format!(
                "batch  [{}/{}]  {}%\n",
                completed,
                total,
                percent_of(*completed, *total)
            ),
            BatchEvent::Completed {
                total,
                successful,
                failed,
            } => format!(
                "batch  done  {} documents, {} completed, {} failed\n",
                total, successful, failed
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BatchProgressReporter for JsonProgress {
    fn report(&self, event: BatchEvent) {
        let obj = match &event {
            BatchEvent::Started { total, windows } => serde_json::json!({
                "event": "started",
                "total": total,
                "windows": windows
            }),
            BatchEvent::WindowStarted {
                window,
                windows,
                size,
            } => serde_json::json!({
                "event": "window",
                "window": window,
                "windows": windows,
                "size": size
            }),
            BatchEvent::ItemStarted { index, label } => serde_json::json!({
                "event": "item",
                "index": index,
                "label": label,
                "state": ItemState::Processing
            }),
            BatchEvent::ItemSettled {
                index,
                label,
                state,
                message,
            } => serde_json::json!({
                "event": "item",
                "index": index,
                "label": label,
                "state": state,
                "message": message
            }),
            BatchEvent::Progress { completed, total } => serde_json::json!({
                "event": "progress",
                "completed": completed,
                "total": total,
                "percent": percent_of(*completed, *total)
            }),
            BatchEvent::Completed {
                total,
                successful,
                failed,
            } => serde_json::json!({
                "event": "completed",
                "total": total,
                "successful": successful,
                "failed": failed
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BatchProgressReporter for NoProgress {
    fn report(&self, _event: BatchEvent) {}
}

/// Forwards events to a channel for a front-end that renders them itself.
pub struct ChannelProgress {
    tx: UnboundedSender<BatchEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<BatchEvent>) -> Self {
        Self { tx }
    }
}

impl BatchProgressReporter for ChannelProgress {
    fn report(&self, event: BatchEvent) {
        // A closed receiver just means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn BatchProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}': expected off, human or json",
                other
            )),
        }
    }
}

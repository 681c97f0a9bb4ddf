use std::io::Error;
use std::path::PathBuf;
use std::time::Duration;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;
use tracing_error::SpanTrace;

use crate::export::{ExportCompletion, ExportFormat};

#[derive(Debug, Error)]
pub enum SVError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("loading failed: {reason}\n{trace}")]
    LoadingFailed { reason: String, trace: SpanTrace },
    #[error("extraction was rejected: {0}")]
    FeedRejected(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("unknown file type: {}", .0.display())]
    UnknownFileType(PathBuf),
    #[error("export transport failed: {0}")]
    Transport(String),
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

impl SVError {
    pub fn loading_failed(reason: impl Into<String>) -> Self {
        SVError::LoadingFailed {
            reason: reason.into(),
            trace: SpanTrace::capture(),
        }
    }
}

impl From<reqwest::Error> for SVError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SVError::Transport(format!("request timed out: {err}"))
        } else if err.is_connect() {
            SVError::Transport(format!("connection failed: {err}"))
        } else {
            SVError::Transport(err.to_string())
        }
    }
}

impl From<arboard::Error> for SVError {
    fn from(err: arboard::Error) -> Self {
        SVError::Clipboard(err.to_string())
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Enter,
    Exit,
    Select,
    Help,
    SwitchView,
    StartDrag,
    ColumnPicker,
    Filter,
    ClearFilter,
    Export(ExportFormat),
    ToggleRaw,
    CopyJson,
    DownloadJson,
    RawKey(KeyEvent),
    Resize(usize, usize),
    ExportFinished(ExportCompletion),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct SVConfig {
    pub event_poll_time: u64,
    #[setters(strip_option, into)]
    pub export_url: Option<String>,
    pub export_timeout: Duration,
    #[setters(into)]
    pub download_dir: PathBuf,
    pub notification_ttl: Duration,
    pub max_column_width: usize,
    #[setters(into)]
    pub log_file: PathBuf,
}

impl Default for SVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            export_url: None,
            export_timeout: Duration::from_secs(30),
            download_dir: PathBuf::from("."),
            notification_ttl: Duration::from_secs(3),
            max_column_width: 30,
            log_file: PathBuf::from("shipview.log"),
        }
    }
}

pub const HELP_TEXT: &str = "\
Table view
  arrows / PgUp / PgDn / Home / End   move the cursor
  m          start dragging the current column
             (arrows pick the target, Enter drops, Esc cancels)
  v          show / hide columns (Space toggles, Esc closes)
  /          filter rows (Enter applies, Esc cancels)
  Backspace  clear the row filter
  x  c  J    export visible data as Excel / CSV / JSON

JSON view
  r          toggle raw / formatted
  y          copy to clipboard
  d          download

Tab  switch view    ?  help    Esc  close    q  quit";

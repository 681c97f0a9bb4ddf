//! Export of the on-screen table.
//!
//! Rows are rebuilt from the rendered grid, never from the record list, so an
//! export contains exactly the visible columns of the displayed rows. The rows
//! are posted to an export service; CSV and JSON fall back to local generation
//! when the service fails, Excel has no local fallback.

use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::columns::{self, ColumnModel};
use crate::domain::{Message, SVError};
use crate::grid::{EMPTY_MARKER, Grid};

pub const EXPORT_FILE_PREFIX: &str = "shipping_data_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
        };
        f.write_str(label)
    }
}

/// One exported row, keyed by column id.
pub type ExportRow = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub data: Vec<ExportRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<Value>,
    pub filename: Option<String>,
    pub download_url: Option<String>,
    pub message: Option<String>,
    /// File body when the service answers with the file itself.
    #[serde(skip)]
    pub attachment: Option<Vec<u8>>,
}

pub fn visible_columns(columns: &ColumnModel) -> Vec<String> {
    columns.visible_ids()
}

/// Rebuilds row objects from the displayed rows of the grid. Cells showing the
/// empty marker become empty strings.
pub fn collect_visible_data(grid: &Grid, visible_columns: &[String]) -> Vec<ExportRow> {
    grid.displayed_rows()
        .map(|row| {
            visible_columns
                .iter()
                .map(|id| {
                    let text = match row.cell(id) {
                        Some(cell) => {
                            let text = cell.text().trim();
                            if text == EMPTY_MARKER { "" } else { text }
                        }
                        None => "",
                    };
                    (id.clone(), Value::String(text.to_string()))
                })
                .collect()
        })
        .collect()
}

pub trait ExportService: Send + Sync {
    fn export(&self, request: &ExportRequest) -> Result<ExportResponse, SVError>;
}

/// Posts export requests as JSON to `<base_url>/export`.
pub struct HttpExportService {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpExportService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SVError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/export", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ExportService for HttpExportService {
    fn export(&self, request: &ExportRequest) -> Result<ExportResponse, SVError> {
        debug!(
            "POST {} ({} rows, {})",
            self.endpoint,
            request.data.len(),
            request.format
        );
        let response = self.client.post(&self.endpoint).json(request).send()?;
        let status = response.status();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let disposition = header(CONTENT_DISPOSITION);
        let body = response.bytes()?;
        trace!("Export service answered {status}, {content_type:?}, {} bytes", body.len());
        decode_response(status, content_type.as_deref(), disposition.as_deref(), &body)
    }
}

/// Interprets an export service answer. JSON bodies are read whatever the
/// status, so a rejection keeps its message; any other body is the exported
/// file.
pub fn decode_response(
    status: StatusCode,
    content_type: Option<&str>,
    disposition: Option<&str>,
    body: &[u8],
) -> Result<ExportResponse, SVError> {
    let is_json = content_type.is_none_or(|ct| {
        ct.trim().to_ascii_lowercase().starts_with("application/json")
    });
    if is_json {
        return match serde_json::from_slice::<ExportResponse>(body) {
            Ok(response) => Ok(response),
            Err(e) if status.is_success() => Err(e.into()),
            Err(_) => Err(SVError::Transport(format!("export service answered {status}"))),
        };
    }
    if !status.is_success() {
        return Err(SVError::Transport(format!("export service answered {status}")));
    }
    Ok(ExportResponse {
        success: true,
        filename: disposition.and_then(disposition_filename),
        attachment: Some(body.to_vec()),
        ..Default::default()
    })
}

/// The `filename` parameter of a Content-Disposition header, without any
/// directory part.
fn disposition_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("filename"))
        .and_then(|(_, value)| {
            let name = value.trim().trim_matches('"');
            Path::new(name).file_name()?.to_str().map(str::to_string)
        })
}

/// Used when no service is configured: every export takes the local path.
pub struct OfflineExportService;

impl ExportService for OfflineExportService {
    fn export(&self, _request: &ExportRequest) -> Result<ExportResponse, SVError> {
        Err(SVError::Transport("no export service configured".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Download { artifact: Artifact, fallback: bool },
    Link { url: String },
    /// The service handled the export without returning a file.
    Completed { message: String },
    /// Nothing was produced, not an error.
    Notice { message: String },
    Failed { message: String },
}

pub fn export_filename(format: ExportFormat) -> String {
    format!(
        "{EXPORT_FILE_PREFIX}{}.{}",
        Utc::now().timestamp_millis(),
        format.extension()
    )
}

pub fn json_artifact(rows: &[ExportRow]) -> Result<Artifact, SVError> {
    Ok(Artifact {
        filename: export_filename(ExportFormat::Json),
        content: serde_json::to_string_pretty(rows)?.into_bytes(),
        content_type: ExportFormat::Json.content_type(),
    })
}

/// Local CSV: header from display names, every field quoted. Columns are the
/// keys of the first row; no rows means no output.
pub fn csv_fallback(rows: &[ExportRow]) -> Result<Option<String>, SVError> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let keys: Vec<&String> = first.keys().collect();
    if keys.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(keys.iter().map(|k| columns::display_name(k)))?;
    for row in rows {
        writer.write_record(keys.iter().map(|k| match row.get(*k) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SVError::IoError(e.into_error()))?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Turns the service result into what the user gets.
pub fn resolve_export(
    format: ExportFormat,
    rows: &[ExportRow],
    result: Result<ExportResponse, SVError>,
) -> ExportOutcome {
    let failure = match result {
        Ok(response) if response.success => return remote_outcome(format, rows, response),
        Ok(response) => {
            warn!("Export service rejected {format} export: {:?}", response.message);
            response.message
        }
        Err(e) => {
            warn!("Export service unreachable for {format} export: {e}");
            None
        }
    };
    fallback_outcome(format, rows, failure)
}

fn remote_outcome(format: ExportFormat, rows: &[ExportRow], response: ExportResponse) -> ExportOutcome {
    if format == ExportFormat::Json {
        // The payload shape of the service is not trusted for JSON.
        return match json_artifact(rows) {
            Ok(artifact) => ExportOutcome::Download {
                artifact,
                fallback: false,
            },
            Err(e) => ExportOutcome::Failed {
                message: format!("Error exporting to {format}: {e}"),
            },
        };
    }
    if let Some(content) = response.attachment {
        return ExportOutcome::Download {
            artifact: Artifact {
                filename: response
                    .filename
                    .unwrap_or_else(|| export_filename(format)),
                content,
                content_type: format.content_type(),
            },
            fallback: false,
        };
    }
    match (response.data, response.download_url) {
        (Some(Value::String(content)), _) => ExportOutcome::Download {
            artifact: Artifact {
                filename: response
                    .filename
                    .unwrap_or_else(|| export_filename(format)),
                content: content.into_bytes(),
                content_type: format.content_type(),
            },
            fallback: false,
        },
        (_, Some(url)) => ExportOutcome::Link { url },
        _ => ExportOutcome::Completed {
            message: format!("{format} export successful!"),
        },
    }
}

fn fallback_outcome(format: ExportFormat, rows: &[ExportRow], message: Option<String>) -> ExportOutcome {
    info!("Generating {format} export locally");
    let local = match format {
        ExportFormat::Csv => csv_fallback(rows).map(|csv| {
            csv.map(|content| Artifact {
                filename: export_filename(format),
                content: content.into_bytes(),
                content_type: format.content_type(),
            })
        }),
        ExportFormat::Json => json_artifact(rows).map(Some),
        ExportFormat::Excel => {
            return ExportOutcome::Failed {
                message: message.unwrap_or_else(|| format!("Error exporting to {format}")),
            };
        }
    };
    match local {
        Ok(Some(artifact)) => ExportOutcome::Download {
            artifact,
            fallback: true,
        },
        Ok(None) => ExportOutcome::Notice {
            message: "No data to export".to_string(),
        },
        Err(e) => {
            error!("Local {format} export failed: {e}");
            ExportOutcome::Failed {
                message: format!("Error exporting to {format}"),
            }
        }
    }
}

pub fn run_export(service: &dyn ExportService, format: ExportFormat, data: Vec<ExportRow>) -> ExportOutcome {
    let request = ExportRequest { format, data };
    let result = service.export(&request);
    resolve_export(format, &request.data, result)
}

#[derive(Debug)]
pub struct ExportCompletion {
    pub format: ExportFormat,
    pub ticket: u64,
    pub outcome: ExportOutcome,
}

/// Hands out tickets per format so only the newest request's result is applied.
#[derive(Debug, Default)]
pub struct ExportTracker {
    next_ticket: u64,
    latest: HashMap<ExportFormat, u64>,
}

impl ExportTracker {
    pub fn issue(&mut self, format: ExportFormat) -> u64 {
        self.next_ticket += 1;
        self.latest.insert(format, self.next_ticket);
        self.next_ticket
    }

    /// True while a request of this format has not been settled.
    pub fn pending(&self, format: ExportFormat) -> bool {
        self.latest.contains_key(&format)
    }

    /// Returns the outcome if the completion belongs to the newest request.
    pub fn settle(&mut self, completion: ExportCompletion) -> Option<ExportOutcome> {
        if self.latest.get(&completion.format) == Some(&completion.ticket) {
            self.latest.remove(&completion.format);
            Some(completion.outcome)
        } else {
            debug!(
                "Dropping stale {} export result (ticket {})",
                completion.format, completion.ticket
            );
            None
        }
    }
}

/// Runs the export on a worker thread and reports back through `sender`.
pub fn spawn_export(
    service: Arc<dyn ExportService>,
    format: ExportFormat,
    ticket: u64,
    data: Vec<ExportRow>,
    sender: Sender<Message>,
) -> Result<JoinHandle<()>, SVError> {
    let handle = thread::Builder::new()
        .name(format!("export-{ticket}"))
        .spawn(move || {
            let outcome = run_export(service.as_ref(), format, data);
            trace!("Export {ticket} finished: {outcome:?}");
            let completion = ExportCompletion {
                format,
                ticket,
                outcome,
            };
            if sender.send(Message::ExportFinished(completion)).is_err() {
                debug!("Event loop gone, discarding export {ticket}");
            }
        })?;
    Ok(handle)
}

/// Writes a download into `dir`. An existing file of the same name gets a
/// numeric suffix instead of being overwritten.
pub fn save_download(dir: &Path, artifact: &Artifact) -> Result<PathBuf, SVError> {
    fs::create_dir_all(dir)?;
    let mut path = dir.join(&artifact.filename);
    let stem = Path::new(&artifact.filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(EXPORT_FILE_PREFIX)
        .to_string();
    let extension = Path::new(&artifact.filename)
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{n}{extension}"));
        n += 1;
    }
    fs::write(&path, &artifact.content)?;
    info!("Saved {} ({} bytes)", path.display(), artifact.content.len());
    Ok(path)
}

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::columns;
use crate::domain::SVError;

/// One extracted shipment, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used while decoding a feed. Records are not modified after that.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Scalar text of a field. Absent, null and empty-string fields have no text.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(scalar_text)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(iter.into_iter().collect())
    }
}

pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug)]
enum FileType {
    JSON,
    CSV,
    PARQUET,
    ARROW,
}

/// Records of one extraction round trip together with the number of source files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub source_files: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub documents: usize,
    pub shipments: usize,
    pub containers: usize,
    pub load_time: Duration,
}

impl Summary {
    pub fn as_line(&self) -> String {
        format!(
            "{} docs | {} shipments | {} containers | {:.1}s",
            self.documents,
            self.shipments,
            self.containers,
            self.load_time.as_secs_f64()
        )
    }
}

impl RecordSet {
    pub fn new(records: Vec<Record>, source_files: usize) -> Self {
        Self {
            records,
            source_files,
        }
    }

    #[instrument(skip_all, fields(files = paths.len()))]
    pub fn load(paths: &[PathBuf]) -> Result<(Self, Duration), SVError> {
        let start_time = Instant::now();
        let mut records = Vec::new();
        for path in paths {
            let loaded = Self::load_file(path)?;
            debug!("Loaded {} records from {}", loaded.len(), path.display());
            records.extend(loaded);
        }
        let load_time = start_time.elapsed();
        info!(
            "Loaded {} records from {} files in {}ms",
            records.len(),
            paths.len(),
            load_time.as_millis()
        );
        Ok((Self::new(records, paths.len()), load_time))
    }

    pub fn summary(&self, load_time: Duration) -> Summary {
        let containers = self
            .records
            .iter()
            .filter(|r| !columns::resolve_text(r, "container_number").trim().is_empty())
            .count();
        Summary {
            documents: self.source_files,
            shipments: self.records.len(),
            containers,
            load_time,
        }
    }

    fn load_file(path: &Path) -> Result<Vec<Record>, SVError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SVError::FileNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => SVError::PermissionDenied(path.to_path_buf()),
            _ => SVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(SVError::loading_failed(format!(
                "{} is not a file",
                path.display()
            )));
        }

        match Self::detect_file_type(path)? {
            FileType::JSON => parse_feed(&fs::read_to_string(path)?),
            FileType::CSV => Self::load_frame(Self::load_csv(path)?),
            FileType::PARQUET => Self::load_frame(Self::load_parquet(path)?),
            FileType::ARROW => Self::load_frame(Self::load_arrow(path)?),
        }
    }

    fn detect_file_type(path: &Path) -> Result<FileType, SVError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("JSON") => Ok(FileType::JSON),
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(SVError::UnknownFileType(path.to_path_buf())),
        }
    }

    // Every column is cast to string; nulls become empty values.
    fn load_frame(frame: LazyFrame) -> Result<Vec<Record>, SVError> {
        let df = frame.collect()?;
        let mut records = vec![Record::new(); df.height()];
        for name in df.get_column_names() {
            let col = df.column(name.as_str())?.cast(&DataType::String)?;
            let series = col.str()?;
            for (record, value) in records.iter_mut().zip(series.into_iter()) {
                let value = match value {
                    Some(s) => Value::String(s.to_string()),
                    None => Value::Null,
                };
                record.0.insert(name.to_string(), value);
            }
        }
        Ok(records)
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
    }

    fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

/// Decodes a JSON feed: a bare record array, an extraction response with
/// `labeled_data`, a `{"data": [...]}` wrapper or a single record object.
pub fn parse_feed(text: &str) -> Result<Vec<Record>, SVError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Array(items) => items.into_iter().map(into_record).collect(),
        Value::Object(mut map) => {
            if let Some(Value::Bool(false)) = map.get("success") {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Error processing files")
                    .to_string();
                return Err(SVError::FeedRejected(message));
            }
            for key in ["labeled_data", "data"] {
                if matches!(map.get(key), Some(Value::Array(_)))
                    && let Some(Value::Array(items)) = map.remove(key)
                {
                    return items.into_iter().map(into_record).collect();
                }
            }
            Ok(vec![Record(map)])
        }
        other => Err(SVError::loading_failed(format!(
            "expected a list of records, found {other}"
        ))),
    }
}

fn into_record(value: Value) -> Result<Record, SVError> {
    match value {
        Value::Object(map) => Ok(Record(map)),
        other => Err(SVError::loading_failed(format!(
            "expected a record object, found {other}"
        ))),
    }
}

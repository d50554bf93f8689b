#![forbid(unsafe_code)]

//! Append-only history of completed speed measurements, persisted as a JSON
//! file. Records keep their insertion order; there is no dedup and no
//! eviction. Consumers rely on every record carrying a parsable date.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("record has an unparsable date `{0}`")]
    InvalidDate(String),
}

/// Which gauge a record belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum SpeedKind {
    Ping,
    Download,
    Upload,
}

impl SpeedKind {
    /// Display unit for a value of this kind.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Ping => "ms",
            Self::Download | Self::Upload => "Mbps",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub label: SpeedKind,
    pub value: f64,
    /// RFC 3339 timestamp.
    pub date: String,
}

impl ResultRecord {
    /// A record stamped with the current wall-clock time.
    #[must_use]
    pub fn now(label: SpeedKind, value: f64) -> Self {
        Self {
            label,
            value,
            date: humantime::format_rfc3339_seconds(SystemTime::now()).to_string(),
        }
    }

    pub fn parsed_date(&self) -> Result<SystemTime> {
        humantime::parse_rfc3339(&self.date).map_err(|_| Error::InvalidDate(self.date.clone()))
    }
}

/// File-backed record list. Each append rewrites the file with the new record
/// at the end; a missing file reads as empty, a corrupt one is an error
/// rather than silently reset.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<ResultRecord>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let records: Vec<ResultRecord> = serde_json::from_slice(&data)?;
        Ok(records)
    }

    pub fn append(&self, record: ResultRecord) -> Result<()> {
        let mut records = self.load()?;
        records.push(record);
        self.write(&records)
    }

    fn write(&self, records: &[ResultRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(records)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

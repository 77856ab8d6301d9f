//! Raw sequencing data records and their file-linking state.
//!
//! # Invariants
//! - `LinkStatus` text encoding roundtrips: `parse(s)` yields a status whose
//!   `as_db_string()` is `s` again, and any other text is rejected.
//! - A failed status always keeps the `failed` prefix in storage.

use serde::Serialize;
use std::fmt::{Display, Formatter};

pub type RawDataId = i64;
pub type FilepathId = i64;

const FAILED_PREFIX: &str = "failed";
const FAILED_REASON_PREFIX: &str = "failed: ";

/// State of the asynchronous job that (un)links uploaded files to raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// No job running; the last one (if any) succeeded.
    Idle,
    Linking,
    Unlinking,
    /// Last job failed; carries the reason as stored after `failed: `.
    Failed(String),
}

impl LinkStatus {
    /// Decodes the stored text; `None` for text this crate never writes.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(Self::Idle),
            "linking" => Some(Self::Linking),
            "unlinking" => Some(Self::Unlinking),
            FAILED_PREFIX => Some(Self::Failed(String::new())),
            other => other
                .strip_prefix(FAILED_REASON_PREFIX)
                .filter(|reason| !reason.is_empty())
                .map(|reason| Self::Failed(reason.to_string())),
        }
    }

    pub fn as_db_string(&self) -> String {
        match self {
            Self::Idle => "idle".to_string(),
            Self::Linking => "linking".to_string(),
            Self::Unlinking => "unlinking".to_string(),
            Self::Failed(reason) if reason.is_empty() => FAILED_PREFIX.to_string(),
            Self::Failed(reason) => format!("{FAILED_REASON_PREFIX}{reason}"),
        }
    }

    /// A link or unlink job is currently running.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Linking | Self::Unlinking)
    }
}

impl Display for LinkStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_db_string())
    }
}

impl Serialize for LinkStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_db_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawData {
    pub id: RawDataId,
    /// Filetype name, e.g. `FASTQ`.
    pub filetype: String,
    pub link_status: LinkStatus,
}

/// A file attached to a record, with its filepath type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filepath {
    pub id: FilepathId,
    pub path: String,
    pub filepath_type: String,
}

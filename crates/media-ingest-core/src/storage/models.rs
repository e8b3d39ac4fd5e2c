use crate::analysis::tokenizer;
use crate::lifecycle::UnitStatus;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// One observation from the append-only ingest log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRecord {
    pub id: i64,
    pub path: String,
    pub file_name: String,
    pub extension: String,
    pub file_size: Option<i64>,
    pub observed_at: String,
    pub processed: bool,
    pub fingerprint: Option<String>,
    pub error_message: Option<String>,
}

impl IngestRecord {
    /// Directory component of `path`; empty for bare file names.
    pub fn folder(&self) -> String {
        parent_dir(&self.path)
    }

    pub fn stem(&self) -> &str {
        tokenizer::split_file_name(&self.file_name).0
    }
}

/// Values for a new ingest_log row. `observed_at` defaults to now.
#[derive(Debug, Clone, Default)]
pub struct NewIngestRecord {
    pub path: String,
    pub file_size: Option<i64>,
    pub fingerprint: Option<String>,
    pub observed_at: Option<String>,
    pub error_message: Option<String>,
}

impl NewIngestRecord {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn observed_at(mut self, observed_at: impl Into<String>) -> Self {
        self.observed_at = Some(observed_at.into());
        self
    }
}

/// A sidecar file linked to a media unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttachedAsset {
    pub path: String,
    pub extension: String,
}

/// Catalog entry: one logical title plus its sidecars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUnit {
    pub id: i64,
    pub folder: String,
    pub core_tokens: Vec<String>,
    pub current_path: String,
    pub primary_extension: String,
    pub alternate_extensions: BTreeSet<String>,
    pub attached_assets: BTreeSet<AttachedAsset>,
    pub fingerprint: Option<String>,
    pub status: UnitStatus,
    pub last_ingest_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl MediaUnit {
    /// Stem of the file currently anchoring the unit.
    pub fn current_stem(&self) -> &str {
        let file_name = self
            .current_path
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.current_path);
        tokenizer::split_file_name(file_name).0
    }
}

/// Values for a unit about to be created. The id is assigned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaUnit {
    pub folder: String,
    pub core_tokens: Vec<String>,
    pub current_path: String,
    pub primary_extension: String,
    pub fingerprint: Option<String>,
    pub last_ingest_id: i64,
}

/// Lifecycle of a resolve_pass row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl PassStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PassStatus::Running => "running",
            PassStatus::Completed => "completed",
            PassStatus::Cancelled => "cancelled",
            PassStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents one resolve pass that was allowed to mutate the catalog.
#[derive(Debug, Clone)]
pub struct ResolvePass {
    pub id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub records_evaluated: i64,
    pub records_committed: i64,
}

/// A decision persisted by a mutating pass.
#[derive(Debug, Clone)]
pub struct DecisionLogEntry {
    pub id: i64,
    pub pass_id: i64,
    pub ingest_id: i64,
    pub classification: String,
    pub reason_code: String,
    pub subject_path: String,
    pub target_unit_id: Option<i64>,
    pub decided_at: String,
}

/// UTC timestamp with fixed-width fractional seconds, so stored values sort as text.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

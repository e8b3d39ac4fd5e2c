use crate::error::Error;
use crate::hasher;
use crate::storage::models::NewIngestRecord;
use crate::storage::Database;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Result of recording one ingest intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub id: i64,
    pub path: String,
    pub exists: bool,
    pub fingerprint: Option<String>,
}

/// Append one ingest_log row for `raw_path`.
///
/// The path must be non-empty and must not name a directory. A missing file is still
/// recorded; its size and fingerprint are left empty. With `compute_fingerprint` the
/// file content is hashed, and a read failure is stored as the record's error message.
pub fn record_ingest(db: &Database, raw_path: &str, compute_fingerprint: bool) -> Result<IngestOutcome, Error> {
    let trimmed = raw_path.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidPath {
            path: raw_path.to_string(),
            reason: "path is empty".to_string(),
        });
    }

    let path = Path::new(trimmed);
    let metadata = fs::metadata(path).ok();
    if metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false) {
        return Err(Error::InvalidPath {
            path: trimmed.to_string(),
            reason: "path is a directory".to_string(),
        });
    }
    if path.file_name().is_none() {
        return Err(Error::InvalidPath {
            path: trimmed.to_string(),
            reason: "path has no file name".to_string(),
        });
    }

    let exists = metadata.is_some();
    let mut record = NewIngestRecord::new(trimmed);
    match &metadata {
        Some(m) => record.file_size = Some(m.len() as i64),
        None => warn!("Recording ingest for missing file {}", trimmed),
    }

    if compute_fingerprint && exists {
        match hasher::content_fingerprint(path) {
            Ok(fingerprint) => record = record.with_fingerprint(fingerprint),
            Err(e) => {
                warn!("Could not fingerprint {}: {}", trimmed, e);
                record.error_message = Some(e.to_string());
            }
        }
    }

    let fingerprint = record.fingerprint.clone();
    let id = db.insert_ingest_record(&record)?;
    debug!("Ingest {} recorded (exists={})", id, exists);

    Ok(IngestOutcome {
        id,
        path: trimmed.to_string(),
        exists,
        fingerprint,
    })
}

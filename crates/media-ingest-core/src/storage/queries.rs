use super::models::*;
use super::sqlite::Database;
use crate::analysis::classifier::CatalogMutation;
use crate::analysis::tokenizer;
use crate::decision::Decision;
use crate::error::Error;
use crate::lifecycle::{IngestState, UnitStatus};
use rusqlite::types::Type;
use rusqlite::{params, Result, Row};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use tracing::debug;

const INGEST_COLUMNS: &str = "id, path, file_name, extension, file_size, observed_at, processed, \
                              fingerprint, error_message";

const UNIT_COLUMNS: &str = "id, folder, core_tokens, current_path, primary_extension, \
                            alternate_extensions, attached_assets, fingerprint, status, \
                            last_ingest_id, created_at, updated_at";

impl Database {
    // ── Ingest Log ───────────────────────────────────────────────

    /// Append one observation. The log is never rewritten apart from the processed flag.
    pub fn insert_ingest_record(&self, record: &NewIngestRecord) -> Result<i64> {
        let file_name = file_name_of(&record.path);
        let (_, extension) = tokenizer::split_file_name(&file_name);
        let observed_at = record.observed_at.clone().unwrap_or_else(timestamp_now);
        self.connection().execute(
            "INSERT INTO ingest_log \
             (path, file_name, extension, file_size, observed_at, processed, fingerprint, error_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
            params![
                record.path,
                file_name,
                extension,
                record.file_size,
                observed_at,
                record.fingerprint,
                record.error_message,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Recorded ingest {} for {}", id, record.path);
        Ok(id)
    }

    pub fn all_ingest_records(&self) -> Result<Vec<IngestRecord>> {
        self.query_ingest_records(
            &format!("SELECT {} FROM ingest_log ORDER BY id", INGEST_COLUMNS),
            [],
        )
    }

    pub fn unprocessed_records(&self) -> Result<Vec<IngestRecord>> {
        self.query_ingest_records(
            &format!(
                "SELECT {} FROM ingest_log WHERE processed = 0 ORDER BY id",
                INGEST_COLUMNS
            ),
            [],
        )
    }

    /// The most recent `limit` records, newest first.
    pub fn recent_ingest_records(&self, limit: usize) -> Result<Vec<IngestRecord>> {
        self.query_ingest_records(
            &format!(
                "SELECT {} FROM ingest_log ORDER BY id DESC LIMIT ?1",
                INGEST_COLUMNS
            ),
            params![limit as i64],
        )
    }

    pub fn get_ingest_record(&self, id: i64) -> Result<Option<IngestRecord>> {
        match self.connection().query_row(
            &format!("SELECT {} FROM ingest_log WHERE id = ?1", INGEST_COLUMNS),
            params![id],
            ingest_from_row,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn query_ingest_records<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<IngestRecord>> {
        let mut stmt = self.connection().prepare_cached(sql)?;
        let records = stmt
            .query_map(params, ingest_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    // ── Media Units ──────────────────────────────────────────────

    pub fn list_units(&self) -> Result<Vec<MediaUnit>> {
        self.query_units(
            &format!("SELECT {} FROM media_unit ORDER BY id", UNIT_COLUMNS),
            [],
        )
    }

    /// The most recently touched `limit` units, newest first.
    pub fn recent_units(&self, limit: usize) -> Result<Vec<MediaUnit>> {
        self.query_units(
            &format!(
                "SELECT {} FROM media_unit ORDER BY updated_at DESC, id DESC LIMIT ?1",
                UNIT_COLUMNS
            ),
            params![limit as i64],
        )
    }

    pub fn get_unit(&self, unit_id: i64) -> Result<Option<MediaUnit>> {
        match self.connection().query_row(
            &format!("SELECT {} FROM media_unit WHERE id = ?1", UNIT_COLUMNS),
            params![unit_id],
            unit_from_row,
        ) {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Id the next created unit will receive.
    pub fn next_unit_id(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM media_unit", [], |row| {
                row.get(0)
            })
    }

    fn query_units<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<MediaUnit>> {
        let mut stmt = self.connection().prepare_cached(sql)?;
        let units = stmt
            .query_map(params, unit_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(units)
    }

    /// Downstream status change. Only `pending → ready | error` is accepted.
    pub fn set_unit_status(&self, unit_id: i64, status: UnitStatus) -> Result<MediaUnit, Error> {
        let mut unit = self.get_unit(unit_id)?.ok_or(Error::UnitNotFound(unit_id))?;
        if !unit.status.can_transition_to(status) {
            return Err(Error::InvalidTransition {
                unit_id,
                from: unit.status.to_string(),
                to: status.to_string(),
            });
        }
        let now = timestamp_now();
        self.connection().execute(
            "UPDATE media_unit SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, unit_id],
        )?;
        debug!("Unit {} status {} -> {}", unit_id, unit.status, status);
        unit.status = status;
        unit.updated_at = now;
        Ok(unit)
    }

    // ── Resolve Passes ───────────────────────────────────────────

    pub fn create_resolve_pass(&self) -> Result<i64> {
        let now = timestamp_now();
        self.connection().execute(
            "INSERT INTO resolve_pass (started_at, status) VALUES (?1, 'running')",
            params![now],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn finish_resolve_pass(
        &self,
        pass_id: i64,
        status: PassStatus,
        records_evaluated: i64,
        records_committed: i64,
    ) -> Result<()> {
        let now = timestamp_now();
        self.connection().execute(
            "UPDATE resolve_pass SET completed_at = ?1, status = ?2, \
             records_evaluated = ?3, records_committed = ?4 WHERE id = ?5",
            params![now, status.as_str(), records_evaluated, records_committed, pass_id],
        )?;
        Ok(())
    }

    pub fn get_resolve_pass(&self, pass_id: i64) -> Result<Option<ResolvePass>> {
        match self.connection().query_row(
            "SELECT id, started_at, completed_at, status, records_evaluated, records_committed \
             FROM resolve_pass WHERE id = ?1",
            params![pass_id],
            |row| {
                Ok(ResolvePass {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    completed_at: row.get(2)?,
                    status: row.get(3)?,
                    records_evaluated: row.get(4)?,
                    records_committed: row.get(5)?,
                })
            },
        ) {
            Ok(pass) => Ok(Some(pass)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ── Decisions ────────────────────────────────────────────────

    /// Commit one verdict atomically: catalog mutation, processed flip for definite
    /// verdicts, and the decision_log row. Returns the id of the unit touched, which for
    /// a created unit is its new id.
    pub fn commit_decision(
        &self,
        pass_id: i64,
        decision: &Decision,
        mutation: &CatalogMutation,
    ) -> Result<Option<i64>, Error> {
        let tx = self.connection().unchecked_transaction()?;
        let now = timestamp_now();

        let touched = apply_mutation(self, mutation, &now)?;

        if IngestState::Unprocessed
            .after(decision.classification)
            .is_processed()
        {
            tx.execute(
                "UPDATE ingest_log SET processed = 1 WHERE id = ?1",
                params![decision.ingest_id],
            )?;
        }

        let target = decision.target_unit_id.or(touched);
        tx.execute(
            "INSERT INTO decision_log \
             (pass_id, ingest_id, classification, reason_code, subject_path, target_unit_id, decided_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                pass_id,
                decision.ingest_id,
                decision.classification.as_str(),
                decision.reason_code.as_str(),
                decision.subject_path,
                target,
                now,
            ],
        )?;

        tx.commit()?;
        Ok(touched)
    }

    pub fn decisions_for_pass(&self, pass_id: i64) -> Result<Vec<DecisionLogEntry>> {
        let mut stmt = self.connection().prepare_cached(
            "SELECT id, pass_id, ingest_id, classification, reason_code, subject_path, \
                    target_unit_id, decided_at \
             FROM decision_log WHERE pass_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![pass_id], |row| {
                Ok(DecisionLogEntry {
                    id: row.get(0)?,
                    pass_id: row.get(1)?,
                    ingest_id: row.get(2)?,
                    classification: row.get(3)?,
                    reason_code: row.get(4)?,
                    subject_path: row.get(5)?,
                    target_unit_id: row.get(6)?,
                    decided_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn apply_mutation(db: &Database, mutation: &CatalogMutation, now: &str) -> Result<Option<i64>, Error> {
    let conn = db.connection();
    let touched = match mutation {
        CatalogMutation::None => return Ok(None),
        CatalogMutation::CreateUnit(new_unit) => {
            conn.execute(
                "INSERT INTO media_unit \
                 (folder, core_tokens, current_path, primary_extension, fingerprint, status, \
                  last_ingest_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?7)",
                params![
                    new_unit.folder,
                    serde_json::to_string(&new_unit.core_tokens)?,
                    new_unit.current_path,
                    new_unit.primary_extension,
                    new_unit.fingerprint,
                    new_unit.last_ingest_id,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Created unit {} with core {:?}", id, new_unit.core_tokens);
            return Ok(Some(id));
        }
        CatalogMutation::ReplacePrimary {
            unit_id,
            current_path,
            core_tokens,
            fingerprint,
            ingest_id,
        } => {
            let rows = conn.execute(
                "UPDATE media_unit SET current_path = ?1, core_tokens = ?2, fingerprint = ?3, \
                 last_ingest_id = ?4, updated_at = ?5 WHERE id = ?6",
                params![
                    current_path,
                    serde_json::to_string(core_tokens)?,
                    fingerprint,
                    ingest_id,
                    now,
                    unit_id,
                ],
            )?;
            (rows, *unit_id)
        }
        CatalogMutation::AddAlternate {
            unit_id,
            extension,
            ingest_id,
        } => {
            let mut extensions: BTreeSet<String> = read_json_column(db, "alternate_extensions", *unit_id)?;
            extensions.insert(extension.clone());
            let rows = conn.execute(
                "UPDATE media_unit SET alternate_extensions = ?1, last_ingest_id = ?2, \
                 updated_at = ?3 WHERE id = ?4",
                params![serde_json::to_string(&extensions)?, ingest_id, now, unit_id],
            )?;
            (rows, *unit_id)
        }
        CatalogMutation::AttachAsset {
            unit_id,
            asset,
            ingest_id,
        } => {
            let mut assets: BTreeSet<AttachedAsset> = read_json_column(db, "attached_assets", *unit_id)?;
            assets.insert(asset.clone());
            let rows = conn.execute(
                "UPDATE media_unit SET attached_assets = ?1, last_ingest_id = ?2, \
                 updated_at = ?3 WHERE id = ?4",
                params![serde_json::to_string(&assets)?, ingest_id, now, unit_id],
            )?;
            (rows, *unit_id)
        }
        CatalogMutation::MovePrimary {
            unit_id,
            folder,
            current_path,
            core_tokens,
            ingest_id,
        } => {
            let rows = conn.execute(
                "UPDATE media_unit SET folder = ?1, current_path = ?2, core_tokens = ?3, \
                 last_ingest_id = ?4, updated_at = ?5 WHERE id = ?6",
                params![
                    folder,
                    current_path,
                    serde_json::to_string(core_tokens)?,
                    ingest_id,
                    now,
                    unit_id,
                ],
            )?;
            (rows, *unit_id)
        }
    };

    match touched {
        (0, unit_id) => Err(Error::UnitNotFound(unit_id)),
        (_, unit_id) => Ok(Some(unit_id)),
    }
}

fn read_json_column<T: DeserializeOwned>(db: &Database, column: &str, unit_id: i64) -> Result<T, Error> {
    let raw: String = match db.connection().query_row(
        &format!("SELECT {} FROM media_unit WHERE id = ?1", column),
        params![unit_id],
        |row| row.get(0),
    ) {
        Ok(raw) => raw,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Err(Error::UnitNotFound(unit_id)),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&raw)?)
}

fn ingest_from_row(row: &Row<'_>) -> Result<IngestRecord> {
    Ok(IngestRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        file_name: row.get(2)?,
        extension: row.get(3)?,
        file_size: row.get(4)?,
        observed_at: row.get(5)?,
        processed: row.get(6)?,
        fingerprint: row.get(7)?,
        error_message: row.get(8)?,
    })
}

fn unit_from_row(row: &Row<'_>) -> Result<MediaUnit> {
    let status: String = row.get(8)?;
    Ok(MediaUnit {
        id: row.get(0)?,
        folder: row.get(1)?,
        core_tokens: json_from_row(row, 2)?,
        current_path: row.get(3)?,
        primary_extension: row.get(4)?,
        alternate_extensions: json_from_row(row, 5)?,
        attached_assets: json_from_row(row, 6)?,
        fingerprint: row.get(7)?,
        status: status
            .parse()
            .map_err(|msg: String| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, msg.into()))?,
        last_ingest_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn json_from_row<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ── Read/write views used by the resolve engine ──────────────────

/// Read view over the append-only ingest log.
pub trait IngestHistory {
    fn all_records(&self) -> Result<Vec<IngestRecord>, Error>;
    fn unprocessed(&self) -> Result<Vec<IngestRecord>, Error>;
    fn most_recent(&self, limit: usize) -> Result<Vec<IngestRecord>, Error>;
}

/// Read/write view over the media unit catalog and the pass bookkeeping.
pub trait Catalog {
    fn units(&self) -> Result<Vec<MediaUnit>, Error>;
    fn next_unit_id(&self) -> Result<i64, Error>;
    fn begin_pass(&self) -> Result<i64, Error>;
    fn finish_pass(&self, pass_id: i64, status: PassStatus, evaluated: i64, committed: i64) -> Result<(), Error>;
    fn commit(&self, pass_id: i64, decision: &Decision, mutation: &CatalogMutation) -> Result<Option<i64>, Error>;
}

impl IngestHistory for Database {
    fn all_records(&self) -> Result<Vec<IngestRecord>, Error> {
        Ok(self.all_ingest_records()?)
    }

    fn unprocessed(&self) -> Result<Vec<IngestRecord>, Error> {
        Ok(self.unprocessed_records()?)
    }

    fn most_recent(&self, limit: usize) -> Result<Vec<IngestRecord>, Error> {
        Ok(self.recent_ingest_records(limit)?)
    }
}

impl Catalog for Database {
    fn units(&self) -> Result<Vec<MediaUnit>, Error> {
        Ok(self.list_units()?)
    }

    fn next_unit_id(&self) -> Result<i64, Error> {
        Ok(Database::next_unit_id(self)?)
    }

    fn begin_pass(&self) -> Result<i64, Error> {
        Ok(self.create_resolve_pass()?)
    }

    fn finish_pass(&self, pass_id: i64, status: PassStatus, evaluated: i64, committed: i64) -> Result<(), Error> {
        Ok(self.finish_resolve_pass(pass_id, status, evaluated, committed)?)
    }

    fn commit(&self, pass_id: i64, decision: &Decision, mutation: &CatalogMutation) -> Result<Option<i64>, Error> {
        self.commit_decision(pass_id, decision, mutation)
    }
}

use crate::analysis::classifier::{classify, FolderContext};
use crate::analysis::cluster::cluster_by_folder;
use crate::analysis::core_derivation::derive_cores;
use crate::analysis::{self, FolderAnalysis};
use crate::config::{AppConfig, EngineSettings};
use crate::decision::{Classification, Decision};
use crate::error::Error;
use crate::progress::{DecisionSink, ProgressReporter};
use crate::storage::models::{timestamp_now, PassStatus};
use crate::storage::{Catalog, Database, IngestHistory};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Whether a pass may write to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    DryRun,
    Apply,
}

pub struct ResolveEngine {
    config: AppConfig,
    cancel: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct PassResult {
    pub mode: PassMode,
    /// Set for mutating passes.
    pub pass_id: Option<i64>,
    pub decisions: Vec<Decision>,
    pub counts: BTreeMap<Classification, usize>,
    pub records_evaluated: usize,
    pub records_committed: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl PassResult {
    pub fn count(&self, classification: Classification) -> usize {
        self.counts.get(&classification).copied().unwrap_or(0)
    }

    /// Decisions left for a later pass (ambiguous or orphan).
    pub fn unresolved(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| !d.classification.is_definite())
            .count()
    }
}

impl ResolveEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a cancellation flag with the caller. Setting it stops the pass before the
    /// next record is committed.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn settings(&self) -> EngineSettings {
        self.config.engine_settings()
    }

    pub fn open_database(&self) -> Result<Database, Error> {
        Database::open(&self.config.db_path)
    }

    /// Read-only folder report over the full ingest history.
    pub fn analyze<S: IngestHistory>(&self, store: &S) -> Result<Vec<FolderAnalysis>, Error> {
        let records = store.all_records()?;
        Ok(analysis::analyze_folders(&records, &self.settings()))
    }

    /// Run one deterministic pass over every unprocessed ingest record:
    /// 1. Snapshot the full history and the catalog
    /// 2. Cluster by folder, derive cores from each folder's PRIMARY stems
    /// 3. Classify each unprocessed record (PRIMARY before ASSET) against a working
    ///    copy of the catalog that every verdict updates
    /// 4. In apply mode, commit each verdict in its own transaction
    pub fn resolve<S>(
        &self,
        store: &S,
        mode: PassMode,
        reporter: &dyn ProgressReporter,
        sink: &dyn DecisionSink,
    ) -> Result<PassResult, Error>
    where
        S: IngestHistory + Catalog,
    {
        let start = Instant::now();
        let settings = self.settings();

        let history = store.all_records()?;
        let pending_ids: HashSet<i64> = store.unprocessed()?.iter().map(|r| r.id).collect();
        let mut catalog = store.units()?;
        let mut next_id = store.next_unit_id()?;

        let clusters = cluster_by_folder(&history);
        let pending_total = pending_ids.len();
        let pending_folders = clusters
            .iter()
            .filter(|c| c.records.iter().any(|r| pending_ids.contains(&r.id)))
            .count();
        info!(
            "Resolving {} unprocessed records across {} folders ({:?})",
            pending_total, pending_folders, mode
        );
        reporter.on_pass_start(pending_folders, pending_total);

        let pass_id = match mode {
            PassMode::Apply => Some(store.begin_pass()?),
            PassMode::DryRun => None,
        };

        let mut decisions: Vec<Decision> = Vec::new();
        let mut counts: BTreeMap<Classification, usize> = BTreeMap::new();
        let mut records_committed = 0usize;
        let mut cancelled = false;

        'folders: for cluster in &clusters {
            let pending: Vec<_> = cluster
                .records_in_evaluation_order()
                .into_iter()
                .filter(|r| pending_ids.contains(&r.id))
                .collect();
            if pending.is_empty() {
                continue;
            }

            reporter.on_folder_start(&cluster.folder, pending.len());
            if !cluster.is_bottom_level() {
                debug!("Folder '{}' has subfolders", cluster.folder);
            }

            let cores = derive_cores(&cluster.folder, &cluster.primary_stems(), &settings);
            let ctx = FolderContext {
                folder: &cluster.folder,
                cores: &cores,
                settings,
            };

            let mut folder_decisions = 0usize;
            for record in pending {
                if self.cancel.load(Ordering::SeqCst) {
                    warn!(
                        "Resolve pass cancelled after {} decisions",
                        decisions.len()
                    );
                    cancelled = true;
                    break 'folders;
                }

                let verdict = classify(record, &ctx, &catalog);
                let mut decision = verdict.decision;
                let now = timestamp_now();

                match pass_id {
                    Some(pass_id) => {
                        let touched = match store.commit(pass_id, &decision, &verdict.mutation) {
                            Ok(touched) => touched,
                            Err(err) => {
                                error!("Commit failed for {}: {}", record.path, err);
                                let evaluated = (decisions.len() + 1) as i64;
                                if let Err(finish_err) = store.finish_pass(
                                    pass_id,
                                    PassStatus::Failed,
                                    evaluated,
                                    records_committed as i64,
                                ) {
                                    error!("Could not close pass {}: {}", pass_id, finish_err);
                                }
                                return Err(err);
                            }
                        };
                        records_committed += 1;
                        let assigned = touched.unwrap_or(next_id);
                        verdict.mutation.apply(&mut catalog, assigned, &now);
                        if decision.classification == Classification::PrimaryNewUnit {
                            if let Some(unit_id) = touched {
                                decision = decision.with_target(unit_id);
                                next_id = unit_id + 1;
                            }
                        }
                    }
                    None => {
                        if verdict.mutation.apply(&mut catalog, next_id, &now) == Some(next_id) {
                            next_id += 1;
                        }
                    }
                }

                debug!("{}", decision);
                sink.emit(&decision);
                *counts.entry(decision.classification).or_default() += 1;
                decisions.push(decision);
                folder_decisions += 1;
            }

            reporter.on_folder_complete(&cluster.folder, folder_decisions);
        }

        if let Some(pass_id) = pass_id {
            let status = if cancelled {
                PassStatus::Cancelled
            } else {
                PassStatus::Completed
            };
            store.finish_pass(
                pass_id,
                status,
                decisions.len() as i64,
                records_committed as i64,
            )?;
        }

        let duration = start.elapsed();
        reporter.on_pass_complete(decisions.len(), duration.as_secs_f64());
        info!(
            "Resolve pass finished in {:.2}s: {} decisions, {} committed{}",
            duration.as_secs_f64(),
            decisions.len(),
            records_committed,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(PassResult {
            mode,
            pass_id,
            records_evaluated: decisions.len(),
            decisions,
            counts,
            records_committed,
            cancelled,
            duration,
        })
    }
}

use super::core_derivation::{derive_cores, FolderCores};
use super::dedupe::{match_fingerprint, FingerprintMatch};
use super::role::FileRole;
use super::tokenizer::{self, TokenSequence};
use crate::config::EngineSettings;
use crate::decision::{Classification, Decision, ReasonCode};
use crate::lifecycle::UnitStatus;
use crate::storage::models::{AttachedAsset, IngestRecord, MediaUnit, NewMediaUnit};
use std::collections::BTreeSet;

/// Change to the catalog carried by a verdict. Ambiguous and orphan verdicts never carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogMutation {
    None,
    CreateUnit(NewMediaUnit),
    /// Same extension: the record replaces the unit's anchor file.
    ReplacePrimary {
        unit_id: i64,
        current_path: String,
        core_tokens: TokenSequence,
        fingerprint: Option<String>,
        ingest_id: i64,
    },
    AddAlternate {
        unit_id: i64,
        extension: String,
        ingest_id: i64,
    },
    AttachAsset {
        unit_id: i64,
        asset: AttachedAsset,
        ingest_id: i64,
    },
    /// Same content seen under a new path.
    MovePrimary {
        unit_id: i64,
        folder: String,
        current_path: String,
        core_tokens: TokenSequence,
        ingest_id: i64,
    },
}

impl CatalogMutation {
    pub fn is_none(&self) -> bool {
        matches!(self, CatalogMutation::None)
    }

    /// Apply to an in-memory catalog. `new_id` is the id a created unit receives.
    /// Returns the id of the touched unit.
    pub fn apply(&self, units: &mut Vec<MediaUnit>, new_id: i64, timestamp: &str) -> Option<i64> {
        match self {
            CatalogMutation::None => None,
            CatalogMutation::CreateUnit(new_unit) => {
                units.push(MediaUnit {
                    id: new_id,
                    folder: new_unit.folder.clone(),
                    core_tokens: new_unit.core_tokens.clone(),
                    current_path: new_unit.current_path.clone(),
                    primary_extension: new_unit.primary_extension.clone(),
                    alternate_extensions: BTreeSet::new(),
                    attached_assets: BTreeSet::new(),
                    fingerprint: new_unit.fingerprint.clone(),
                    status: UnitStatus::Pending,
                    last_ingest_id: new_unit.last_ingest_id,
                    created_at: timestamp.to_string(),
                    updated_at: timestamp.to_string(),
                });
                Some(new_id)
            }
            CatalogMutation::ReplacePrimary {
                unit_id,
                current_path,
                core_tokens,
                fingerprint,
                ingest_id,
            } => {
                let unit = units.iter_mut().find(|u| u.id == *unit_id)?;
                unit.current_path = current_path.clone();
                unit.core_tokens = core_tokens.clone();
                unit.fingerprint = fingerprint.clone();
                unit.last_ingest_id = *ingest_id;
                unit.updated_at = timestamp.to_string();
                Some(unit.id)
            }
            CatalogMutation::AddAlternate {
                unit_id,
                extension,
                ingest_id,
            } => {
                let unit = units.iter_mut().find(|u| u.id == *unit_id)?;
                unit.alternate_extensions.insert(extension.clone());
                unit.last_ingest_id = *ingest_id;
                unit.updated_at = timestamp.to_string();
                Some(unit.id)
            }
            CatalogMutation::AttachAsset {
                unit_id,
                asset,
                ingest_id,
            } => {
                let unit = units.iter_mut().find(|u| u.id == *unit_id)?;
                unit.attached_assets.insert(asset.clone());
                unit.last_ingest_id = *ingest_id;
                unit.updated_at = timestamp.to_string();
                Some(unit.id)
            }
            CatalogMutation::MovePrimary {
                unit_id,
                folder,
                current_path,
                core_tokens,
                ingest_id,
            } => {
                let unit = units.iter_mut().find(|u| u.id == *unit_id)?;
                unit.folder = folder.clone();
                unit.current_path = current_path.clone();
                unit.core_tokens = core_tokens.clone();
                unit.last_ingest_id = *ingest_id;
                unit.updated_at = timestamp.to_string();
                Some(unit.id)
            }
        }
    }
}

/// A decision plus the catalog change it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub mutation: CatalogMutation,
}

impl Verdict {
    fn new(decision: Decision, mutation: CatalogMutation) -> Self {
        Self { decision, mutation }
    }

    fn without_mutation(decision: Decision) -> Self {
        Self::new(decision, CatalogMutation::None)
    }
}

/// What the classifier knows about the record's folder.
pub struct FolderContext<'a> {
    pub folder: &'a str,
    pub cores: &'a FolderCores,
    pub settings: EngineSettings,
}

/// Classify one ingest record against the current catalog.
///
/// `catalog` is every known unit; only units of the record's folder are consulted for
/// core matches, while fingerprints are compared catalog-wide.
pub fn classify(record: &IngestRecord, ctx: &FolderContext<'_>, catalog: &[MediaUnit]) -> Verdict {
    let role = FileRole::for_extension(&record.extension);
    if role == FileRole::Ignore {
        return Verdict::without_mutation(Decision::new(
            record.id,
            Classification::Ignored,
            ReasonCode::UnsupportedExtension,
            record.path.as_str(),
        ));
    }

    if tokenizer::tokenize(record.stem()).is_empty() {
        return Verdict::without_mutation(Decision::new(
            record.id,
            Classification::Ignored,
            ReasonCode::MalformedStem,
            record.path.as_str(),
        ));
    }

    let folder_units: Vec<&MediaUnit> = catalog.iter().filter(|u| u.folder == ctx.folder).collect();

    match role {
        FileRole::Primary => classify_primary(record, ctx, catalog, &folder_units),
        _ => classify_asset(record, ctx, &folder_units),
    }
}

fn classify_primary(
    record: &IngestRecord,
    ctx: &FolderContext<'_>,
    catalog: &[MediaUnit],
    folder_units: &[&MediaUnit],
) -> Verdict {
    let core = record_core(record, ctx);

    match match_fingerprint(record.fingerprint.as_deref(), &record.path, catalog) {
        FingerprintMatch::Fallback => {}
        FingerprintMatch::SamePath(unit) => {
            return Verdict::without_mutation(
                Decision::new(
                    record.id,
                    Classification::Noise,
                    ReasonCode::FingerprintSamePath,
                    record.path.as_str(),
                )
                .with_target(unit.id),
            );
        }
        FingerprintMatch::MultipleUnits(_) => {
            return Verdict::without_mutation(Decision::new(
                record.id,
                Classification::PrimaryAmbiguous,
                ReasonCode::FingerprintMultipleUnits,
                record.path.as_str(),
            ));
        }
        FingerprintMatch::Moved(unit) => {
            let conflict = folder_units
                .iter()
                .any(|other| other.id != unit.id && shares_core(other, &core, ctx.cores));
            if conflict {
                return Verdict::without_mutation(Decision::new(
                    record.id,
                    Classification::PrimaryAmbiguous,
                    ReasonCode::FingerprintCoreConflict,
                    record.path.as_str(),
                ));
            }
            return Verdict::new(
                Decision::new(
                    record.id,
                    Classification::PrimaryPathUpdate,
                    ReasonCode::FingerprintNewPath,
                    record.path.as_str(),
                )
                .with_target(unit.id),
                CatalogMutation::MovePrimary {
                    unit_id: unit.id,
                    folder: ctx.folder.to_string(),
                    current_path: record.path.clone(),
                    core_tokens: core,
                    ingest_id: record.id,
                },
            );
        }
    }

    let sharing: Vec<&MediaUnit> = folder_units
        .iter()
        .copied()
        .filter(|unit| shares_core(unit, &core, ctx.cores))
        .collect();

    match sharing.as_slice() {
        [] => Verdict::new(
            Decision::new(
                record.id,
                Classification::PrimaryNewUnit,
                ReasonCode::NoUnitWithCore,
                record.path.as_str(),
            ),
            CatalogMutation::CreateUnit(NewMediaUnit {
                folder: ctx.folder.to_string(),
                core_tokens: core,
                current_path: record.path.clone(),
                primary_extension: record.extension.clone(),
                fingerprint: record.fingerprint.clone(),
                last_ingest_id: record.id,
            }),
        ),
        [unit] if unit.primary_extension == record.extension => Verdict::new(
            Decision::new(
                record.id,
                Classification::PrimaryUpdate,
                ReasonCode::CoreMatchSameExtension,
                record.path.as_str(),
            )
            .with_target(unit.id),
            CatalogMutation::ReplacePrimary {
                unit_id: unit.id,
                current_path: record.path.clone(),
                core_tokens: core,
                fingerprint: record.fingerprint.clone(),
                ingest_id: record.id,
            },
        ),
        [unit] => Verdict::new(
            Decision::new(
                record.id,
                Classification::PrimaryAlternate,
                ReasonCode::CoreMatchNewExtension,
                record.path.as_str(),
            )
            .with_target(unit.id),
            CatalogMutation::AddAlternate {
                unit_id: unit.id,
                extension: record.extension.clone(),
                ingest_id: record.id,
            },
        ),
        _ => Verdict::without_mutation(Decision::new(
            record.id,
            Classification::PrimaryAmbiguous,
            ReasonCode::MultipleUnitsShareCore,
            record.path.as_str(),
        )),
    }
}

/// Units are matched in tiers and the first tier with any match decides:
/// core is a prefix of the tag-stripped base, then a prefix of the full stem,
/// then a run anywhere in the stem (site-prefixed sidecars).
fn classify_asset(record: &IngestRecord, ctx: &FolderContext<'_>, folder_units: &[&MediaUnit]) -> Verdict {
    let base = tokenizer::asset_base_tokens(record.stem());
    let full = tokenizer::fold(&tokenizer::tokenize(record.stem()));

    let mut matching = units_matching(folder_units, ctx.cores, |core| {
        tokenizer::starts_with_run(&base, core)
    });
    if matching.is_empty() {
        matching = units_matching(folder_units, ctx.cores, |core| {
            tokenizer::starts_with_run(&full, core)
        });
    }
    if matching.is_empty() {
        matching = units_matching(folder_units, ctx.cores, |core| {
            tokenizer::contains_run(&full, core)
        });
    }

    match matching.as_slice() {
        [unit] => Verdict::new(
            Decision::new(
                record.id,
                Classification::AssetAttach,
                ReasonCode::SingleCoreMatch,
                record.path.as_str(),
            )
            .with_target(unit.id),
            CatalogMutation::AttachAsset {
                unit_id: unit.id,
                asset: AttachedAsset {
                    path: record.path.clone(),
                    extension: record.extension.clone(),
                },
                ingest_id: record.id,
            },
        ),
        [] => Verdict::without_mutation(Decision::new(
            record.id,
            Classification::AssetOrphan,
            ReasonCode::NoPrimaryCoreMatch,
            record.path.as_str(),
        )),
        _ => Verdict::without_mutation(Decision::new(
            record.id,
            Classification::AssetAmbiguous,
            ReasonCode::MultipleCoreMatches,
            record.path.as_str(),
        )),
    }
}

/// Current core of the record's stem. A stem missing from the folder derivation is
/// treated as a folder of its own.
fn record_core(record: &IngestRecord, ctx: &FolderContext<'_>) -> TokenSequence {
    let stem = record.stem();
    match ctx.cores.core_for_stem(stem) {
        Some(core) => core.to_vec(),
        None => derive_cores(ctx.folder, &[stem.to_string()], &ctx.settings)
            .core_for_stem(stem)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
    }
}

/// Persisted core plus, when it differs, the core currently derived for the unit's anchor stem.
fn effective_cores<'u>(unit: &'u MediaUnit, cores: &'u FolderCores) -> Vec<&'u [String]> {
    let mut result: Vec<&[String]> = vec![unit.core_tokens.as_slice()];
    if let Some(current) = cores.core_for_stem(unit.current_stem()) {
        if current != unit.core_tokens.as_slice() {
            result.push(current);
        }
    }
    result
}

fn units_matching<'u>(
    units: &[&'u MediaUnit],
    cores: &FolderCores,
    matches: impl Fn(&[String]) -> bool,
) -> Vec<&'u MediaUnit> {
    units
        .iter()
        .copied()
        .filter(|unit| effective_cores(unit, cores).iter().any(|core| matches(core)))
        .collect()
}

fn shares_core(unit: &MediaUnit, core: &[String], cores: &FolderCores) -> bool {
    !core.is_empty() && effective_cores(unit, cores).iter().any(|c| *c == core)
}

pub mod classifier;
pub mod cluster;
pub mod core_derivation;
pub mod decoration;
pub mod dedupe;
pub mod role;
pub mod tokenizer;

use crate::config::EngineSettings;
use crate::storage::models::IngestRecord;
use cluster::{cluster_by_folder, FolderCluster};
use core_derivation::{derive_cores, FolderCores};
use decoration::{extract_decorations, FolderDecorations};
use rayon::prelude::*;
use role::FileRole;
use tracing::info;

/// Read-only exploration of one folder: how its primaries group and what decorates them.
#[derive(Debug, Clone)]
pub struct FolderAnalysis {
    pub folder: String,
    pub bottom_level: bool,
    pub primary_count: usize,
    pub asset_count: usize,
    pub ignored_count: usize,
    pub cores: FolderCores,
    pub decorations: FolderDecorations,
}

impl FolderAnalysis {
    /// Candidates grouping two or more primary stems.
    pub fn multi_primary_candidates(&self) -> impl Iterator<Item = &core_derivation::MediaUnitCandidate> {
        self.cores
            .candidates
            .iter()
            .filter(|c| c.primary_stems.len() > 1)
    }

    pub fn singleton_count(&self) -> usize {
        self.cores
            .candidates
            .iter()
            .filter(|c| c.primary_stems.len() == 1)
            .count()
    }
}

pub fn analyze_folder(cluster: &FolderCluster<'_>, settings: &EngineSettings) -> FolderAnalysis {
    let mut primary_count = 0;
    let mut asset_count = 0;
    let mut ignored_count = 0;
    for record in &cluster.records {
        match FileRole::for_extension(&record.extension) {
            FileRole::Primary => primary_count += 1,
            FileRole::Asset => asset_count += 1,
            FileRole::Ignore => ignored_count += 1,
        }
    }

    let cores = derive_cores(&cluster.folder, &cluster.primary_stems(), settings);
    let decorations = extract_decorations(&cores);

    FolderAnalysis {
        folder: cluster.folder.clone(),
        bottom_level: cluster.is_bottom_level(),
        primary_count,
        asset_count,
        ignored_count,
        cores,
        decorations,
    }
}

/// Analyze every folder of the history in parallel. Output is ordered by folder.
pub fn analyze_folders(records: &[IngestRecord], settings: &EngineSettings) -> Vec<FolderAnalysis> {
    let clusters = cluster_by_folder(records);
    info!("Analyzing {} folders...", clusters.len());

    let mut analyses: Vec<FolderAnalysis> = clusters
        .par_iter()
        .filter(|cluster| cluster.has_primary())
        .map(|cluster| analyze_folder(cluster, settings))
        .collect();
    analyses.sort_by(|a, b| a.folder.cmp(&b.folder));

    info!("Analyzed {} folders with primary media", analyses.len());
    analyses
}

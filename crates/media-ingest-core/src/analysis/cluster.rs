use super::role::FileRole;
use super::tokenizer;
use crate::storage::models::IngestRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Ingest records sharing one directory. Rebuilt on every pass, never persisted.
#[derive(Debug, Clone)]
pub struct FolderCluster<'a> {
    pub folder: String,
    pub records: Vec<&'a IngestRecord>,
    /// Another cluster lives below this directory.
    pub has_subfolders: bool,
}

impl<'a> FolderCluster<'a> {
    pub fn is_bottom_level(&self) -> bool {
        !self.has_subfolders
    }

    pub fn has_primary(&self) -> bool {
        self.records
            .iter()
            .any(|r| FileRole::for_extension(&r.extension) == FileRole::Primary)
    }

    /// Distinct, sorted stems of PRIMARY records that tokenize to something.
    pub fn primary_stems(&self) -> Vec<String> {
        let stems: BTreeSet<String> = self
            .records
            .iter()
            .filter(|r| FileRole::for_extension(&r.extension) == FileRole::Primary)
            .map(|r| r.stem().to_string())
            .filter(|stem| !tokenizer::tokenize(stem).is_empty())
            .collect();
        stems.into_iter().collect()
    }

    /// Records in evaluation order: PRIMARY first, then ASSET, then the rest; each group
    /// by `observed_at`, then id.
    pub fn records_in_evaluation_order(&self) -> Vec<&'a IngestRecord> {
        let mut ordered = self.records.clone();
        ordered.sort_by(|a, b| {
            FileRole::for_extension(&a.extension)
                .cmp(&FileRole::for_extension(&b.extension))
                .then_with(|| a.observed_at.cmp(&b.observed_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        ordered
    }
}

/// Partition records by directory. Output is ordered by folder path.
pub fn cluster_by_folder(records: &[IngestRecord]) -> Vec<FolderCluster<'_>> {
    let mut by_folder: BTreeMap<String, Vec<&IngestRecord>> = BTreeMap::new();
    for record in records {
        by_folder.entry(record.folder()).or_default().push(record);
    }

    let folders: Vec<String> = by_folder.keys().cloned().collect();

    by_folder
        .into_iter()
        .map(|(folder, records)| {
            let has_subfolders = !folder.is_empty()
                && folders
                    .iter()
                    .any(|other| other != &folder && Path::new(other).starts_with(&folder));
            FolderCluster {
                folder,
                records,
                has_subfolders,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, path: &str, observed_at: &str) -> IngestRecord {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let extension = tokenizer::split_file_name(&file_name).1;
        IngestRecord {
            id,
            path: path.to_string(),
            file_name,
            extension,
            file_size: None,
            observed_at: observed_at.to_string(),
            processed: false,
            fingerprint: None,
            error_message: None,
        }
    }

    #[test]
    fn test_groups_by_directory() {
        let records = vec![
            record(1, "/in/a/x.mp4", "2025-01-01T00:00:00Z"),
            record(2, "/in/b/y.mp4", "2025-01-01T00:00:01Z"),
            record(3, "/in/a/x.nfo", "2025-01-01T00:00:02Z"),
        ];
        let clusters = cluster_by_folder(&records);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].folder, "/in/a");
        assert_eq!(clusters[0].records.len(), 2);
        assert_eq!(clusters[1].folder, "/in/b");
    }

    #[test]
    fn test_folder_without_primary() {
        let records = vec![
            record(1, "/in/a/x.nfo", "2025-01-01T00:00:00Z"),
            record(2, "/in/a/x.txt", "2025-01-01T00:00:00Z"),
        ];
        let clusters = cluster_by_folder(&records);
        assert!(!clusters[0].has_primary());
        assert!(clusters[0].primary_stems().is_empty());
    }

    #[test]
    fn test_primary_stems_are_distinct_and_sorted() {
        let records = vec![
            record(1, "/in/a/b.mp4", "t1"),
            record(2, "/in/a/a.mkv", "t2"),
            record(3, "/in/a/b.mkv", "t3"),
            record(4, "/in/a/---.mp4", "t4"),
        ];
        let clusters = cluster_by_folder(&records);
        assert_eq!(clusters[0].primary_stems(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_nested_folders_are_flagged() {
        let records = vec![
            record(1, "/in/show/x.mp4", "t1"),
            record(2, "/in/show/season1/y.mp4", "t2"),
        ];
        let clusters = cluster_by_folder(&records);
        assert!(!clusters[0].is_bottom_level());
        assert!(clusters[1].is_bottom_level());
    }

    #[test]
    fn test_evaluation_order_puts_primaries_first() {
        let records = vec![
            record(1, "/in/a/x.nfo", "2025-01-01T00:00:00Z"),
            record(2, "/in/a/x.mkv", "2025-01-01T00:00:05Z"),
            record(3, "/in/a/x.mp4", "2025-01-01T00:00:03Z"),
        ];
        let clusters = cluster_by_folder(&records);
        let order: Vec<i64> = clusters[0]
            .records_in_evaluation_order()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(order, vec![3, 2, 1]);
    }
}

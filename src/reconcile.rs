//! Folding backend responses back into the local file list.
//!
//! Both merges join on `original_path` with exact string equality. The list
//! is indexed once per batch instead of scanning it for every result.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::models::{FileEntry, IdentifiedFile, Operation, OutcomeStatus, RenameOutcome};

/// Maps `original_path` to its position in the file list. When the list
/// holds duplicates the first occurrence wins.
#[derive(Debug, Default)]
pub struct PathIndex {
    positions: HashMap<String, usize>,
}

impl PathIndex {
    pub fn build(files: &[FileEntry]) -> Self {
        let mut positions = HashMap::with_capacity(files.len());
        for (idx, entry) in files.iter().enumerate() {
            positions.entry(entry.original_path.clone()).or_insert(idx);
        }
        Self { positions }
    }

    pub fn get(&self, path: &str) -> Option<usize> {
        self.positions.get(path).copied()
    }

    fn rekey(&mut self, old_path: &str, new_path: &str, idx: usize) {
        if self.positions.get(old_path) == Some(&idx) {
            self.positions.remove(old_path);
        }
        self.positions.entry(new_path.to_string()).or_insert(idx);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderCollision {
    pub sub_folder: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifyReport {
    pub merged: usize,
    /// Result paths with no local entry; they never create entries.
    pub unmatched: Vec<String>,
    /// Results the backend flagged with an error, as `(path, error)`.
    pub failed: Vec<(String, String)>,
    pub collisions: Vec<FolderCollision>,
}

/// Overwrites `new_name`, `new_sub_folder` and `tmdb_match` on every entry
/// that has a result; all other fields are left alone.
pub fn merge_identified(files: &mut [FileEntry], results: &[IdentifiedFile]) -> IdentifyReport {
    let index = PathIndex::build(files);
    let mut report = IdentifyReport::default();
    let mut folder_usage: BTreeMap<&str, usize> = BTreeMap::new();

    for result in results {
        if let Some(error) = &result.error {
            report.failed.push((result.original_path.clone(), error.clone()));
        }

        let Some(idx) = index.get(&result.original_path) else {
            warn!(path = %result.original_path, "identification result has no matching file");
            report.unmatched.push(result.original_path.clone());
            continue;
        };

        let entry = &mut files[idx];
        entry.new_name = result.new_name.clone().unwrap_or_default();
        entry.new_sub_folder = result.new_sub_folder.clone().unwrap_or_default();
        entry.tmdb_match = result.tmdb.clone();
        report.merged += 1;

        debug!(
            path = %entry.original_path,
            new_name = %entry.new_name,
            new_sub_folder = %entry.new_sub_folder,
            "merged identification result"
        );

        if let Some(folder) = result.new_sub_folder.as_deref().filter(|f| !f.is_empty()) {
            *folder_usage.entry(folder).or_default() += 1;
        }
    }

    report.collisions = folder_usage
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(folder, count)| FolderCollision {
            sub_folder: folder.to_string(),
            count,
        })
        .collect();

    for collision in &report.collisions {
        warn!(
            sub_folder = %collision.sub_folder,
            count = collision.count,
            "multiple files map to the same folder"
        );
    }

    report
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameApplication {
    pub renamed: Vec<(String, String)>,
    /// Files the backend removed on its own, e.g. duplicates.
    pub deleted: Vec<String>,
    pub untouched: usize,
}

/// Applies per-file rename outcomes. Only a successful rename with a
/// `new_path` mutates an entry: `renamed` is set first, then the path is
/// replaced and the proposal cleared.
pub fn apply_rename_outcomes(files: &mut [FileEntry], outcomes: &[RenameOutcome]) -> RenameApplication {
    let mut index = PathIndex::build(files);
    let mut applied = RenameApplication::default();

    for outcome in outcomes {
        match (outcome.status, outcome.operation, outcome.new_path.as_deref()) {
            (OutcomeStatus::Success, Operation::Delete, _) => {
                info!(file = %outcome.file, "backend removed file");
                applied.deleted.push(outcome.file.clone());
            }
            (OutcomeStatus::Success, Operation::Rename, Some(new_path)) => match index.get(&outcome.file) {
                Some(idx) => {
                    let entry = &mut files[idx];
                    entry.renamed = true;
                    entry.original_path = new_path.to_string();
                    entry.new_name.clear();
                    entry.new_sub_folder.clear();

                    index.rekey(&outcome.file, new_path, idx);
                    info!(from = %outcome.file, to = %new_path, "file renamed");
                    applied.renamed.push((outcome.file.clone(), new_path.to_string()));
                }
                None => {
                    warn!(file = %outcome.file, "rename outcome has no matching file");
                    applied.untouched += 1;
                }
            },
            _ => {
                debug!(file = %outcome.file, status = ?outcome.status, "no local change for outcome");
                applied.untouched += 1;
            }
        }
    }

    applied
}

//! Client-side file-list state and the actions that drive the backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::endpoints::Endpoint;
use crate::error::{ClientError, Result};
use crate::models::{
    DeleteFileResponse, DirectoryEntry, DirectoryItem, FileDetails, FileEntry, FilePathRequest, FileSelection,
    IdentifiedFile, IdentifyRequest, IdentifyResponse, MediaLibrary, OutcomeStatus, RenameRequest, RenameResponse,
    RenameSummary, ScanResponse, Settings,
};
use crate::reconcile::{IdentifyReport, PathIndex, apply_rename_outcomes, merge_identified};
use crate::session::Session;
use crate::tree::{HierarchicalNode, build_tree, flatten_tree};

/// Counts operations in flight. Each action holds a [`LoadingGuard`] for its
/// whole duration, so the flag drops back on success, failure, or cancellation.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicUsize>);

impl LoadingFlag {
    pub fn begin(&self) -> LoadingGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(self.0.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

#[derive(Debug)]
pub struct LoadingGuard(Arc<AtomicUsize>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Application state for one backend: the discovered files, their pending
/// identification/rename work, and the last loaded backend settings.
///
/// Actions take `&mut self`, so two of them can never interleave on the same
/// state; callers that share it serialize access themselves.
#[derive(Debug)]
pub struct AppState {
    client: ApiClient,
    files: Vec<FileEntry>,
    files_to_identify: Vec<String>,
    rename_results: Option<RenameSummary>,
    settings: Settings,
    loading: LoadingFlag,
    error: Option<String>,
    initialized: bool,
}

impl AppState {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            files: Vec::new(),
            files_to_identify: Vec::new(),
            rename_results: None,
            settings: Settings::default(),
            loading: LoadingFlag::default(),
            error: None,
            initialized: false,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn selected_files(&self) -> Vec<&FileEntry> {
        self.files.iter().filter(|f| f.selected).collect()
    }

    pub fn files_to_identify(&self) -> &[String] {
        &self.files_to_identify
    }

    pub fn rename_results(&self) -> Option<&RenameSummary> {
        self.rename_results.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drops all local state; the next action re-initializes.
    pub fn reset(&mut self) {
        self.files.clear();
        self.files_to_identify.clear();
        self.rename_results = None;
        self.settings = Settings::default();
        self.error = None;
        self.initialized = false;
    }

    pub fn snapshot(&self) -> Session {
        Session {
            files: self.files.clone(),
            files_to_identify: self.files_to_identify.clone(),
            rename_results: self.rename_results.clone(),
        }
    }

    pub fn restore(&mut self, session: Session) {
        self.files = session.files;
        self.files_to_identify = session.files_to_identify;
        self.rename_results = session.rename_results;
    }

    fn track<T>(&mut self, action: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(e) => {
                error!(action, error = %e, "action failed");
                self.error = Some(e.to_string());
            }
        }
        result
    }

    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        info!("initializing state");
        self.load_config().await?;
        self.initialized = true;
        info!(libraries = self.settings.media_libraries.len(), "state initialized");
        Ok(())
    }

    pub async fn load_config(&mut self) -> Result<&Settings> {
        let _loading = self.loading.begin();
        let result = self.client.get_json::<Settings>(Endpoint::GetConfig, &[]).await;
        let settings = self.track("load config", result)?;
        self.settings = settings;
        Ok(&self.settings)
    }

    /// Replaces the file list with a fresh scan of every configured library.
    /// Every discovered file starts out selected.
    pub async fn scan(&mut self, full_scan: bool) -> Result<usize> {
        self.initialize().await?;
        // The settings page may have changed the libraries since initialization.
        self.load_config().await?;

        let _loading = self.loading.begin();
        self.files.clear();

        let result = self.scan_inner(full_scan).await;
        self.track("scan", result)
    }

    async fn scan_inner(&mut self, full_scan: bool) -> Result<usize> {
        self.settings.validate_libraries()?;

        info!(full_scan, "scanning libraries");
        let full_scan = if full_scan { "true" } else { "false" };
        let response: ScanResponse = self.client.get_json(Endpoint::Scan, &[("full_scan", full_scan)]).await?;

        let Some(paths) = response.files else {
            warn!("scan response carried no file list");
            return Ok(0);
        };

        self.files = paths.into_iter().map(FileEntry::discovered).collect();
        info!(count = self.files.len(), "scan complete");
        Ok(self.files.len())
    }

    /// Queues explicit paths for the next [`identify`](Self::identify) call,
    /// overriding the selection.
    pub fn set_files_to_identify(&mut self, paths: Vec<String>) {
        self.files_to_identify = paths;
    }

    /// Asks the backend to identify the queued paths (or, with an empty
    /// queue, the selected files) and merges the results.
    pub async fn identify(&mut self) -> Result<IdentifyReport> {
        if !self.files.iter().any(|f| f.selected) {
            let result = Err(ClientError::validation("No files are selected"));
            return self.track("identify", result);
        }

        let _loading = self.loading.begin();
        let result = self.identify_inner().await;
        self.track("identify", result)
    }

    async fn identify_inner(&mut self) -> Result<IdentifyReport> {
        let paths: Vec<&String> = if self.files_to_identify.is_empty() {
            self.files.iter().filter(|f| f.selected).map(|f| &f.original_path).collect()
        } else {
            self.files_to_identify.iter().collect()
        };
        let request = IdentifyRequest(
            paths
                .into_iter()
                .map(|path| FileSelection {
                    original_path: path.clone(),
                    selected: true,
                })
                .collect(),
        );

        info!(count = request.0.len(), "identifying files");
        let response: IdentifyResponse = self.client.post_json(Endpoint::Identify, &request).await?;

        let report = match response.files {
            Some(results) => merge_identified(&mut self.files, &results),
            None => {
                warn!("identify response carried no file list");
                IdentifyReport::default()
            }
        };
        self.files_to_identify.clear();

        info!(
            merged = report.merged,
            unmatched = report.unmatched.len(),
            collisions = report.collisions.len(),
            "identification merged"
        );
        Ok(report)
    }

    pub fn update_identified_files(&mut self, results: &[IdentifiedFile]) -> IdentifyReport {
        merge_identified(&mut self.files, results)
    }

    /// Submits every rename-ready selected file as one batch.
    ///
    /// With nothing ready, returns an all-zero summary without contacting the backend.
    pub async fn rename(&mut self) -> Result<RenameSummary> {
        let result = self.rename_inner().await;
        self.track("rename", result)
    }

    async fn rename_inner(&mut self) -> Result<RenameSummary> {
        if !self.initialized {
            return Err(ClientError::validation("State is not initialized"));
        }
        self.settings.validate_libraries()?;

        let batch: Vec<FileEntry> = self.files.iter().filter(|f| f.is_rename_ready()).cloned().collect();
        if batch.is_empty() {
            info!("no files ready to rename");
            return Ok(RenameSummary::nothing_to_do());
        }

        let _loading = self.loading.begin();
        info!(count = batch.len(), "renaming files");
        let response: RenameResponse = self.client.post_json(Endpoint::Rename, &RenameRequest(batch)).await?;

        let Some(success) = response.success.filter(|s| s.is_truthy()) else {
            let reason = response
                .message
                .or(response.detail)
                .unwrap_or_else(|| "Rename failed, check file permissions".to_string());
            return Err(ClientError::application(reason));
        };

        let results = response.results.unwrap_or_default();
        let applied = apply_rename_outcomes(&mut self.files, &results);
        info!(
            renamed = applied.renamed.len(),
            deleted = applied.deleted.len(),
            untouched = applied.untouched,
            "rename outcomes applied"
        );

        let success = success
            .count()
            .unwrap_or_else(|| results.iter().filter(|r| r.status == OutcomeStatus::Success).count() as u64);
        let summary = RenameSummary {
            success,
            warnings: response.warnings,
            errors: response.errors,
            message: format!(
                "Rename finished: {} succeeded, {} unchanged, {} failed",
                success, response.warnings, response.errors
            ),
            results,
        };

        self.rename_results = Some(summary.clone());
        Ok(summary)
    }

    pub async fn update_config(&mut self, settings: Settings) -> Result<&Settings> {
        let _loading = self.loading.begin();
        info!(libraries = settings.media_libraries.len(), "updating config");

        let result = match self.client.post_json_optional::<_, Settings>(Endpoint::UpdateConfig, &settings).await {
            Ok(Some(saved)) => Ok(saved),
            Ok(None) => Err(ClientError::application("No data returned from backend")),
            Err(ClientError::Status { detail, .. }) => Err(ClientError::application(
                detail.unwrap_or_else(|| "Failed to update configuration".to_string()),
            )),
            Err(e) => Err(e),
        };

        self.settings = self.track("update config", result)?;
        Ok(&self.settings)
    }

    pub async fn add_library(&mut self, library: MediaLibrary) -> Result<&Settings> {
        let mut settings = self.settings.clone();
        settings.media_libraries.push(library);
        self.save_libraries(settings).await
    }

    pub async fn remove_library(&mut self, path: &str) -> Result<&Settings> {
        let mut settings = self.settings.clone();
        let before = settings.media_libraries.len();
        settings.media_libraries.retain(|library| library.path != path);

        let found = if settings.media_libraries.len() < before {
            Ok(())
        } else {
            Err(ClientError::validation(format!("No library configured at {}", path)))
        };
        self.track("remove library", found)?;
        self.save_libraries(settings).await
    }

    async fn save_libraries(&mut self, settings: Settings) -> Result<&Settings> {
        let checked = settings.validate_libraries();
        self.track("update config", checked)?;
        self.update_config(settings).await
    }

    pub async fn save_settings(&mut self, settings: Settings) -> Result<&Settings> {
        let result = match settings.validate_libraries() {
            Ok(()) => {
                let _loading = self.loading.begin();
                self.client.post_json::<_, Settings>(Endpoint::SaveSettings, &settings).await
            }
            Err(e) => Err(e),
        };

        self.settings = self.track("save settings", result)?;
        Ok(&self.settings)
    }

    pub async fn test_connection(&mut self) -> Result<()> {
        let _loading = self.loading.begin();
        let result = self.client.post_discard(Endpoint::TestConfig, &self.settings).await;
        self.track("test connection", result)
    }

    pub async fn get_directories(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let result = self.fetch_directories(path).await;
        self.track("list directories", result)
    }

    async fn fetch_directories(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let response: Value = self.client.get_json(Endpoint::Directories, &[("path", path)]).await?;

        let Some(Value::Array(items)) = response.get("directories") else {
            return Err(ClientError::application("Invalid directory listing format"));
        };

        items
            .iter()
            .map(|item| {
                serde_json::from_value::<DirectoryItem>(item.clone())
                    .map(DirectoryEntry::from)
                    .map_err(|_| ClientError::application("Invalid directory listing format"))
            })
            .collect()
    }

    pub async fn file_details(&mut self, path: &str) -> Result<FileDetails> {
        let result = self
            .client
            .post_json(Endpoint::FileDetails, &FilePathRequest { file_path: path })
            .await;
        self.track("file details", result)
    }

    /// Deletes a file on the backend. The local entry is kept; a later scan
    /// reflects the removal.
    pub async fn delete_file(&mut self, path: &str) -> Result<DeleteFileResponse> {
        let _loading = self.loading.begin();
        let result = self
            .client
            .post_json::<_, DeleteFileResponse>(Endpoint::DeleteFile, &FilePathRequest { file_path: path })
            .await;
        if let Ok(response) = &result {
            info!(path, success = response.success, message = %response.message, "delete requested");
        }
        self.track("delete file", result)
    }

    pub fn tree(&self) -> Vec<HierarchicalNode> {
        build_tree(&self.files)
    }

    pub fn select_all(&mut self) {
        self.files.iter_mut().for_each(|f| f.selected = true);
    }

    pub fn select_none(&mut self) {
        self.files.iter_mut().for_each(|f| f.selected = false);
    }

    pub fn select_paths<S: AsRef<str>>(&mut self, paths: &[S]) -> usize {
        let wanted: HashSet<&str> = paths.iter().map(|p| p.as_ref()).collect();
        self.apply(|f| wanted.contains(f.original_path.as_str()))
    }

    pub fn select_matching(&mut self, pattern: &Regex) -> usize {
        self.apply(|f| pattern.is_match(&f.original_path))
    }

    pub fn apply_selection(&mut self, forest: &[HierarchicalNode]) -> usize {
        let selections = flatten_tree(forest);
        let index = PathIndex::build(&self.files);

        let mut applied = 0;
        for selection in selections {
            if let Some(idx) = index.get(&selection.original_path) {
                self.files[idx].selected = selection.selected;
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, mut predicate: impl FnMut(&FileEntry) -> bool) -> usize {
        let mut selected = 0;
        for entry in &mut self.files {
            entry.selected = predicate(entry);
            if entry.selected {
                selected += 1;
            }
        }
        selected
    }
}

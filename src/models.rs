use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

/// A media file discovered by a scan, plus its identification and rename state.
///
/// `original_path` is the join key against every backend response. After a
/// successful rename it holds the *new* path, so the entry can go through
/// another identify/rename cycle without being reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub original_path: String,
    #[serde(default = "default_selected")]
    pub selected: bool,
    #[serde(default)]
    pub new_name: String,
    #[serde(default)]
    pub new_sub_folder: String,
    #[serde(default, rename = "tmdb")]
    pub tmdb_match: Option<TmdbMatch>,
    #[serde(flatten)]
    pub titles: TitleInfo,
    #[serde(default)]
    pub renamed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_selected() -> bool {
    true
}

impl FileEntry {
    pub fn discovered(path: impl Into<String>) -> Self {
        Self {
            original_path: path.into(),
            selected: true,
            new_name: String::new(),
            new_sub_folder: String::new(),
            tmdb_match: None,
            titles: TitleInfo::default(),
            renamed: false,
            error: None,
        }
    }

    pub fn file_name(&self) -> &str {
        last_component(&self.original_path)
    }

    pub fn has_match(&self) -> bool {
        self.tmdb_match.as_ref().is_some_and(TmdbMatch::has_id)
    }

    pub fn is_rename_ready(&self) -> bool {
        self.selected && self.has_match() && !self.new_name.is_empty() && !self.new_sub_folder.is_empty()
    }

    pub fn selection(&self) -> FileSelection {
        FileSelection {
            original_path: self.original_path.clone(),
            selected: self.selected,
        }
    }
}

pub(crate) fn last_component(path: &str) -> &str {
    path.rsplit(['/', '\\']).find(|part| !part.is_empty()).unwrap_or(path)
}

/// External metadata identifier; the backend has sent both numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TmdbId {
    Number(i64),
    Text(String),
}

impl TmdbId {
    pub fn is_present(&self) -> bool {
        match self {
            TmdbId::Number(n) => *n != 0,
            TmdbId::Text(s) => !s.trim().is_empty(),
        }
    }
}

impl fmt::Display for TmdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TmdbId::Number(n) => write!(f, "{}", n),
            TmdbId::Text(s) => f.write_str(s),
        }
    }
}

/// Metadata record attached to a file once identification succeeds.
///
/// Only the fields the client reasons about are typed; everything else the
/// backend sends is kept in `extra` and sent back untouched on rename.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TmdbMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TmdbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TmdbMatch {
    pub fn has_id(&self) -> bool {
        self.id.as_ref().is_some_and(TmdbId::is_present)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelection {
    pub original_path: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

/// Body of `POST /files/identify`; a bare JSON array on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct IdentifyRequest(pub Vec<FileSelection>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedFile {
    pub original_path: String,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub new_sub_folder: Option<String>,
    #[serde(default)]
    pub tmdb: Option<TmdbMatch>,
    #[serde(flatten)]
    pub titles: TitleInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Titles and year the identifier extracted from the file name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TitleInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chinese_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<ReleaseYear>,
}

impl TitleInfo {
    pub fn is_empty(&self) -> bool {
        self.chinese_title.is_none() && self.english_title.is_none() && self.year.is_none()
    }
}

// Model output sometimes quotes the year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReleaseYear {
    Number(u32),
    Text(String),
}

impl fmt::Display for ReleaseYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseYear::Number(year) => write!(f, "{}", year),
            ReleaseYear::Text(year) => f.write_str(year),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifyResponse {
    #[serde(default)]
    pub files: Option<Vec<IdentifiedFile>>,
}

/// Body of `POST /files/rename`; a bare JSON array on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct RenameRequest(pub Vec<FileEntry>);

/// The rename endpoint reports `success` as a count; older builds sent a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuccessFlag {
    Flag(bool),
    Count(u64),
}

impl SuccessFlag {
    pub fn is_truthy(self) -> bool {
        match self {
            SuccessFlag::Flag(flag) => flag,
            SuccessFlag::Count(count) => count > 0,
        }
    }

    pub fn count(self) -> Option<u64> {
        match self {
            SuccessFlag::Count(count) => Some(count),
            SuccessFlag::Flag(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Warning,
    Error,
    NotFound,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Rename,
    Delete,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameOutcome {
    pub status: OutcomeStatus,
    #[serde(default)]
    pub operation: Operation,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenameResponse {
    #[serde(default)]
    pub success: Option<SuccessFlag>,
    #[serde(default)]
    pub warnings: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub results: Option<Vec<RenameOutcome>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Batch outcome kept for display. `results` is never filtered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenameSummary {
    pub success: u64,
    pub warnings: u64,
    pub errors: u64,
    pub message: String,
    pub results: Vec<RenameOutcome>,
}

impl RenameSummary {
    pub fn nothing_to_do() -> Self {
        Self {
            message: "No files are ready to rename".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaLibrary {
    #[serde(default)]
    pub path: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl MediaLibrary {
    pub fn new(path: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.path.trim().is_empty() && !self.kind.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub media_libraries: Vec<MediaLibrary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_rate_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_extension: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn validate_libraries(&self) -> Result<()> {
        if self.media_libraries.is_empty() {
            return Err(ClientError::validation(
                "No media library is configured; add one in the settings first",
            ));
        }

        let incomplete: Vec<&MediaLibrary> = self.media_libraries.iter().filter(|lib| !lib.is_complete()).collect();
        if !incomplete.is_empty() {
            tracing::error!(?incomplete, "incomplete media library configuration");
            return Err(ClientError::validation(
                "Media library configuration is incomplete; every library needs a path and a type",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
}

/// Listing entries arrive either as bare paths or as `{name, path}` objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DirectoryItem {
    Path(String),
    Info { name: String, path: String },
}

impl From<DirectoryItem> for DirectoryEntry {
    fn from(item: DirectoryItem) -> Self {
        match item {
            DirectoryItem::Path(path) => DirectoryEntry {
                name: last_component(&path).to_string(),
                path,
            },
            DirectoryItem::Info { name, path } => DirectoryEntry { name, path },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilePathRequest<'a> {
    pub file_path: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    pub full_path: String,
    pub creation_time: String,
    pub modification_time: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::models::{FileEntry, RenameSummary};

pub const DEFAULT_SESSION_FILE: &str = ".media-organizer-session.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub files_to_identify: Vec<String>,
    #[serde(default)]
    pub rename_results: Option<RenameSummary>,
}

impl Session {
    /// Reads a saved session; a missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let filename = path.display().to_string();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(SessionError::Io { filename, source }),
        };
        serde_json::from_str(&contents).map_err(|source| SessionError::Format { filename, source })
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let filename = path.display().to_string();
        let contents = serde_json::to_string_pretty(self).map_err(|source| SessionError::Format {
            filename: filename.clone(),
            source,
        })?;
        fs::write(path, contents).map_err(|source| SessionError::Io { filename, source })
    }
}

use std::fmt;

use reqwest::{Method, Url};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Scan,
    Identify,
    Rename,
    Directories,
    FileDetails,
    DeleteFile,
    GetConfig,
    UpdateConfig,
    TestConfig,
    SaveSettings,
}

impl Endpoint {
    pub const ALL: [Endpoint; 10] = [
        Endpoint::Scan,
        Endpoint::Identify,
        Endpoint::Rename,
        Endpoint::Directories,
        Endpoint::FileDetails,
        Endpoint::DeleteFile,
        Endpoint::GetConfig,
        Endpoint::UpdateConfig,
        Endpoint::TestConfig,
        Endpoint::SaveSettings,
    ];

    pub fn method(self) -> Method {
        match self {
            Endpoint::Scan | Endpoint::Directories | Endpoint::GetConfig => Method::GET,
            _ => Method::POST,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Scan => "files/scan",
            Endpoint::Identify => "files/identify",
            Endpoint::Rename => "files/rename",
            Endpoint::Directories => "files/directories",
            Endpoint::FileDetails => "files/get_file_details",
            Endpoint::DeleteFile => "files/delete_file",
            Endpoint::GetConfig | Endpoint::UpdateConfig => "config",
            Endpoint::TestConfig => "config/test",
            Endpoint::SaveSettings => "settings",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Endpoint::Scan => "scan",
            Endpoint::Identify => "identify",
            Endpoint::Rename => "rename",
            Endpoint::Directories => "list-directories",
            Endpoint::FileDetails => "file-details",
            Endpoint::DeleteFile => "delete-file",
            Endpoint::GetConfig => "get-config",
            Endpoint::UpdateConfig => "update-config",
            Endpoint::TestConfig => "test-config",
            Endpoint::SaveSettings => "save-settings",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::BaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let base = Url::parse(base_url.trim_end_matches('/')).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn url(&self, endpoint: Endpoint) -> Url {
        let mut url = self.base.clone();
        // Always Ok: cannot-be-a-base URLs are rejected in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(endpoint.path().split('/'));
        }
        url
    }
}

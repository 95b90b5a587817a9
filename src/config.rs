use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8088/api";

/// Request timeout policy for backend calls.
///
/// Scans of large libraries and remote identification can take minutes, so
/// the default is [`Timeout::Never`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "TimeoutRepr", into = "TimeoutRepr")]
pub enum Timeout {
    #[default]
    Never,
    Seconds(u64),
}

impl Timeout {
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Timeout::Never => None,
            Timeout::Seconds(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Never => write!(f, "never"),
            Timeout::Seconds(secs) => write!(f, "{}s", secs),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TimeoutRepr {
    Keyword(String),
    Seconds(u64),
}

impl TryFrom<TimeoutRepr> for Timeout {
    type Error = String;

    fn try_from(repr: TimeoutRepr) -> Result<Self, Self::Error> {
        match repr {
            TimeoutRepr::Keyword(word) if word.eq_ignore_ascii_case("never") => Ok(Timeout::Never),
            TimeoutRepr::Keyword(word) => Err(format!("unknown timeout '{}', expected \"never\" or seconds", word)),
            // 0 meant "never" in some HTTP stacks and "immediately" in others.
            TimeoutRepr::Seconds(0) => Err("timeout of 0 is ambiguous, use \"never\"".to_string()),
            TimeoutRepr::Seconds(secs) => Ok(Timeout::Seconds(secs)),
        }
    }
}

impl From<Timeout> for TimeoutRepr {
    fn from(timeout: Timeout) -> Self {
        match timeout {
            Timeout::Never => TimeoutRepr::Keyword("never".to_string()),
            Timeout::Seconds(secs) => TimeoutRepr::Seconds(secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Timeout,
    /// Extra headers; merged over `Content-Type: application/json`.
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Timeout::Never,
            headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    let filename = path.display().to_string();

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        filename: filename.clone(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse { filename, source })
}

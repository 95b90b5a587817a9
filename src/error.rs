use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Local pre-flight check failed; nothing was sent to the backend.
    #[error("{0}")]
    Validation(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}{}", format_detail(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    /// The backend answered 2xx but the payload reports a failure.
    #[error("{0}")]
    Application(String),

    #[error("unable to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn format_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn application(msg: impl Into<String>) -> Self {
        ClientError::Application(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file '{filename}': {source}")]
    FileRead {
        filename: String,
        source: std::io::Error,
    },
    #[error("Unable to parse config file '{filename}': {source}")]
    Parse {
        filename: String,
        source: toml::de::Error,
    },
    #[error("invalid base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },
    #[error("unable to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not access session file '{filename}': {source}")]
    Io {
        filename: String,
        source: std::io::Error,
    },
    #[error("session file '{filename}' is corrupt: {source}")]
    Format {
        filename: String,
        source: serde_json::Error,
    },
}

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::{ClientError, ConfigError, Result};

/// Thin adapter over `reqwest` bound to one backend.
///
/// Every failure is logged and handed back unchanged. There are no retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let endpoints = Endpoints::new(&config.base_url)?;

        let mut builder = Client::builder().default_headers(config.header_map()?);
        if let Some(timeout) = config.timeout.as_duration() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConfigError::HttpClient)?;

        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn request(&self, endpoint: Endpoint) -> RequestBuilder {
        self.http.request(endpoint.method(), self.endpoints.url(endpoint))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint, query: &[(&str, &str)]) -> Result<T> {
        let body = self.send(endpoint, self.request(endpoint).query(query)).await?;
        decode(endpoint, &body)
    }

    pub async fn post_json<B, T>(&self, endpoint: Endpoint, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(endpoint, self.request(endpoint).json(payload)).await?;
        decode(endpoint, &body)
    }

    /// Like [`post_json`](Self::post_json), but an empty or `null` body yields `None`.
    pub async fn post_json_optional<B, T>(&self, endpoint: Endpoint, payload: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(endpoint, self.request(endpoint).json(payload)).await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        decode(endpoint, &body).map(Some)
    }

    pub async fn post_discard<B: Serialize + ?Sized>(&self, endpoint: Endpoint, payload: &B) -> Result<()> {
        self.send(endpoint, self.request(endpoint).json(payload)).await?;
        Ok(())
    }

    async fn send(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<String> {
        debug!(%endpoint, url = %self.endpoints.url(endpoint), "sending request");

        let response = request.send().await.map_err(|e| {
            error!(%endpoint, error = %e, "request failed");
            ClientError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(%endpoint, error = %e, "failed to read response body");
            ClientError::Transport(e)
        })?;

        if !status.is_success() {
            let detail = extract_detail(&body);
            error!(%endpoint, %status, detail = ?detail, "backend rejected request");
            return Err(ClientError::Status { status, detail });
        }

        debug!(%endpoint, %status, bytes = body.len(), "received response");
        Ok(body)
    }
}

// Goes through `Value` so a key repeated in one object resolves to its last
// occurrence; the rename endpoint sends `success` twice.
fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<T> {
    serde_json::from_str::<Value>(body)
        .and_then(serde_json::from_value)
        .map_err(|e| {
            error!(%endpoint, error = %e, "unable to decode response");
            ClientError::Decode(e)
        })
}

fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeout;
    use crate::models::{RenameResponse, SuccessFlag};

    #[test]
    fn test_detail_from_string_or_structured_body() {
        assert_eq!(extract_detail(r#"{"detail": "Directory not found"}"#).as_deref(), Some("Directory not found"));
        assert_eq!(
            extract_detail(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#).as_deref(),
            Some(r#"[{"loc":["body"],"msg":"field required"}]"#)
        );
        assert!(extract_detail("Internal Server Error").is_none());
        assert!(extract_detail(r#"{"message": "nope"}"#).is_none());
    }

    #[test]
    fn test_builds_with_and_without_timeout() {
        assert!(ApiClient::new(&ClientConfig::default()).is_ok());
        let config = ClientConfig::default().with_timeout(Timeout::Seconds(5));
        assert!(ApiClient::new(&config).is_ok());
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = ClientConfig::default().with_base_url("::nope::");
        assert!(matches!(ApiClient::new(&config), Err(ConfigError::BaseUrl { .. })));
    }

    #[test]
    fn test_decode_keeps_last_of_repeated_keys() {
        let body = r#"{"success":true,"success":1,"warnings":0,"errors":0,"results":[]}"#;
        let response: RenameResponse = decode(Endpoint::Rename, body).unwrap();
        assert_eq!(response.success, Some(SuccessFlag::Count(1)));
        assert_eq!(response.results, Some(vec![]));
    }

    #[test]
    fn test_decode_reports_malformed_json() {
        let err = decode::<RenameResponse>(Endpoint::Rename, "{not json").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}

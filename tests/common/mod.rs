// In-process stand-in for the organizer backend. Every request is recorded;
// replies are looked up by "METHOD /path".
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use media_organizer::{ApiClient, AppState, ClientConfig};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Json(StatusCode, Value),
    Raw(StatusCode, String),
}

#[derive(Default)]
struct Shared {
    replies: HashMap<String, Reply>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone)]
pub struct FakeBackend {
    pub base_url: String,
    shared: Arc<Mutex<Shared>>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let app = Router::new().fallback(handle).with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            shared,
        }
    }

    /// Backend whose config has one complete movie library.
    pub async fn with_library() -> Self {
        let backend = Self::start().await;
        backend.reply("GET", "/api/config", 200, settings_with_library());
        backend
    }

    pub fn reply(&self, method: &str, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap();
        self.shared
            .lock()
            .unwrap()
            .replies
            .insert(format!("{} {}", method, path), Reply::Json(status, body));
    }

    pub fn reply_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.shared
            .lock()
            .unwrap()
            .replies
            .insert(format!("{} {}", method, path), Reply::Raw(status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&ClientConfig::default().with_base_url(self.base_url.clone())).unwrap()
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.client())
    }
}

async fn handle(
    State(shared): State<Arc<Mutex<Shared>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };

    let mut shared = shared.lock().unwrap();
    shared.requests.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    match shared.replies.get(&format!("{} {}", method, uri.path())) {
        Some(Reply::Json(status, value)) => (*status, axum::Json(value.clone())).into_response(),
        Some(Reply::Raw(status, text)) => (*status, text.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, axum::Json(json!({"detail": "Not Found"}))).into_response(),
    }
}

pub fn settings_with_library() -> Value {
    json!({
        "media_libraries": [{"path": "/lib", "type": "movie"}],
        "tmdb_api_key": "key",
        "tmdb_rate_limit": 50,
        "grok_batch_size": 20
    })
}

//! Client for a media organizer backend: scan configured libraries, have the
//! backend identify files against online metadata, review the proposed names,
//! and submit batch renames.
//!
//! [`store::AppState`] holds the file list and drives every backend call
//! through [`api::ApiClient`]; [`reconcile`] folds responses back into the list.

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod tree;

pub use api::ApiClient;
pub use config::{ClientConfig, Timeout, load_config};
pub use error::{ClientError, ConfigError, Result, SessionError};
pub use models::{FileEntry, RenameSummary, Settings};
pub use store::AppState;

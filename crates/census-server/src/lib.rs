//! HTTP server assembly for the census service.
//!
//! Wraps the [`census_api`] router with request tracing and a body size
//! limit, and loads the runtime [`ServerConfig`].

use std::{path::{Path, PathBuf}, sync::Arc};

use axum::{Router, extract::DefaultBodyLimit};
use census_core::store::CitizenStore;
use config::{ConfigError, Environment, File, Source};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration.
///
/// Built from defaults, then `config.toml`, then `CENSUS_*` environment
/// variables, each layer overriding the previous.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  pub store_path:     PathBuf,
  /// Upper bound on request bodies; imports of tens of thousands of
  /// citizens run to several megabytes.
  pub max_body_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:           "0.0.0.0".to_string(),
      port:           8080,
      store_path:     PathBuf::from("census.sqlite3"),
      max_body_bytes: 64 * 1024 * 1024,
    }
  }
}

impl ServerConfig {
  /// Load from an optional TOML file at `path` plus the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_source(File::from(path).required(false))
  }

  fn from_source<T>(file: T) -> Result<Self, ConfigError>
  where
    T: Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(Environment::with_prefix("CENSUS"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application: the JSON API plus tracing and body limits.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: CitizenStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  census_api::api_router(store)
    .layer(DefaultBodyLimit::max(config.max_body_bytes))
    .layer(TraceLayer::new_for_http())
}

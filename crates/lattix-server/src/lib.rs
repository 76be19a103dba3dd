//! The Lattix server: configuration and the top-level HTTP router.
//!
//! The JSON API from [`lattix_api`] is mounted under `/api`, wrapped in a
//! request-tracing layer.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use lattix_api::{CronAuth, Notifier, api_router};
use lattix_core::store::ProgressStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `LATTIX_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// argon2 PHC string of the scheduler's bearer secret.
  pub cron_secret_hash: String,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/lattix/lattix.db") }

impl ServerConfig {
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

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S, N>(store: Arc<S>, notifier: Arc<N>, config: &ServerConfig) -> Router
where
  S: ProgressStore + 'static,
  N: Notifier + 'static,
{
  let cron = CronAuth { secret_hash: config.cron_secret_hash.clone() };

  Router::new()
    .nest("/api", api_router(store, notifier, cron))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use lattix_api::LogNotifier;
  use lattix_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn config_from(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn config_defaults() {
    let cfg = config_from(r#"cron_secret_hash = "$argon2id$stub""#);
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert!(cfg.store_path.ends_with("lattix.db"));
  }

  #[test]
  fn config_overrides() {
    let cfg = config_from(
      r#"
      host = "0.0.0.0"
      port = 9000
      store_path = "/var/lib/lattix.db"
      cron_secret_hash = "$argon2id$stub"
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/lattix.db"));
  }

  #[test]
  fn tilde_expansion_leaves_absolute_paths() {
    let abs = Path::new("/tmp/lattix.db");
    assert_eq!(expand_tilde(abs), abs);
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = config_from(r#"cron_secret_hash = "not-a-hash""#);
    let app = router(Arc::new(store), Arc::new(LogNotifier), &cfg);

    let req = Request::builder()
      .method("POST")
      .uri("/api/reminders/check")
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
      .uri("/reminders/check")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}

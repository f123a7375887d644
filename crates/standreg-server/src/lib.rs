//! HTTP server wiring for the taxi-stand registry.
//!
//! Holds the runtime configuration, the top-level router, and the legacy
//! import step run at startup. The binary in `main.rs` only parses the
//! command line and drives these.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use standreg_core::{change::Actor, legacy::import_document, store::StandStore};
use tower_http::trace::TraceLayer;
use tracing::info;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STANDREG_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Actor credited for writes whose request names none.
  pub default_actor: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "127.0.0.1".to_string(),
      port:          3001,
      store_path:    PathBuf::from("standreg.db"),
      default_actor: Actor::SYSTEM.to_string(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`, with request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: StandStore + 'static,
{
  Router::new()
    .nest("/api", standreg_api::api_router(store, Actor::new(&config.default_actor)))
    .layer(TraceLayer::new_for_http())
}

// ─── Legacy import ───────────────────────────────────────────────────────────

/// Import a legacy JSON document into `store`, replacing any stand with the
/// same identifier. Returns the number of stands written.
pub async fn import_legacy<S>(store: &S, document: &str) -> anyhow::Result<usize>
where
  S: StandStore,
{
  let stands = import_document(document)?;
  let count = stands.len();
  for stand in stands {
    let stand_id = stand.stand_id;
    store
      .upsert(stand)
      .await
      .with_context(|| format!("failed to store stand {stand_id}"))?;
  }
  info!(stands = count, "legacy import complete");
  Ok(count)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{body::Body, http::Request};
  use standreg_core::memory::MemoryStore;
  use tower::ServiceExt as _;

  const DOCUMENT: &str = r#"[{
    "id": "42",
    "name": "Konak Taksi",
    "capacity": "4",
    "plates": ["35 K 42"],
    "status": "Pasif",
    "createdAt": "2024-01-01T00:00:00Z",
    "updatedAt": "2024-01-01T00:00:00Z",
    "history": []
  }]"#;

  #[test]
  fn config_defaults() {
    let cfg = ServerConfig::default();
    assert_eq!(cfg.port, 3001);
    assert_eq!(cfg.default_actor, "system");
  }

  #[test]
  fn config_layers_over_defaults() {
    let settings = config::Config::builder()
      .set_override("port", 8080)
      .unwrap()
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.host, "127.0.0.1");
  }

  #[tokio::test]
  async fn imported_stands_are_served_under_api() {
    let store = MemoryStore::new();
    assert_eq!(import_legacy(&store, DOCUMENT).await.unwrap(), 1);

    let app = app(Arc::new(store), &ServerConfig::default());
    let req = Request::builder()
      .uri("/api/stands?q=konak")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_success());

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let stands: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stands[0]["capacity"], 4);
    assert_eq!(stands[0]["status"], "passive");
  }

  #[tokio::test]
  async fn malformed_document_fails_import() {
    let store = MemoryStore::new();
    assert!(import_legacy(&store, "[{").await.is_err());
  }
}

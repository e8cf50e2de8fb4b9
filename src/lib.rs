//! files-manager
//!
//! Minimal file storage API: uploads are written to local disk and indexed
//! per user, with access resolved from session tokens.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::DocumentStore;
use crate::session::SessionStore;
use crate::storage::BlobStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub docs: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub blobs: Arc<dyn BlobStore>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/status", get(handlers::app::get_status))
        .route("/stats", get(handlers::app::get_stats));

    let protected_routes = Router::new()
        .route(
            "/files",
            get(handlers::file::get_index).post(handlers::file::post_upload),
        )
        .route("/files/:id", get(handlers::file::get_show))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::{test_database, SqliteDocumentStore};
    use crate::session::{auth_key, SqliteSessionStore};
    use crate::storage::LocalStorage;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    pub struct TestApp {
        pub router: Router,
        pub sessions: Arc<SqliteSessionStore>,
        pub dir: TempDir,
    }

    impl TestApp {
        pub async fn login(&self, token: &str, user_id: &str) {
            self.sessions
                .set(&auth_key(token), user_id, Duration::from_secs(3600))
                .await
                .unwrap();
        }

        pub fn blob_count(&self) -> usize {
            match std::fs::read_dir(self.dir.path().join("files")) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }
    }

    pub async fn test_app() -> TestApp {
        let db = test_database().await;
        app_with(
            Arc::new(SqliteDocumentStore::new(db.clone())),
            Arc::new(SqliteSessionStore::new(db)),
        )
        .await
    }

    pub async fn app_with(
        docs: Arc<dyn DocumentStore>,
        sessions: Arc<SqliteSessionStore>,
    ) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.folder_path = dir.path().join("files").to_string_lossy().into_owned();

        let state = AppState {
            blobs: Arc::new(LocalStorage::new(&config.storage.folder_path)),
            config: Arc::new(config),
            docs,
            sessions: sessions.clone(),
        };

        TestApp {
            router: create_router(state),
            sessions,
            dir,
        }
    }

    /// Issue one request and decode the JSON reply
    pub async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("x-token", token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

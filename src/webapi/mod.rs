//! Read-only admin HTTP surface.
//!
//! Routes (all under the configured base path):
//! - `GET /components`
//! - `GET /commands`
//! - `GET /commands/:id`
//! - `GET /commands/:id/options`
//! - `GET /stats`
//!
//! Component and command listings are memoized in the `webapi_responses`
//! cache until [`invalidate_responses`] is called.

mod commands;
mod components;
mod error;
mod stats;

use std::future::Future;

use anyhow::Context;
use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub use error::ApiError;

use crate::bot::AppState;
use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::config::{WebApiConfig, WebApiMode};

/// Cache holding serialized listings.
pub const RESPONSE_CACHE: &str = "webapi_responses";

/// Build the admin router nested under `base_path`.
pub fn router(state: AppState, base_path: &str, trace: bool) -> Router {
    let api = Router::new()
        .route("/components", get(components::list))
        .route("/commands", get(commands::list))
        .route("/commands/:id", get(commands::get))
        .route("/commands/:id/options", get(commands::options))
        .route("/stats", get(stats::get))
        .with_state(state);

    let base_path = base_path.trim_end_matches('/');
    let nested = if base_path.is_empty() {
        api
    } else {
        Router::new().nest(base_path, api)
    };
    let router = nested.fallback(not_found);

    if trace {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Serve the admin API until `shutdown` flips to `true`.
pub async fn serve(
    state: AppState,
    config: WebApiConfig,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router(state, &config.base_path, config.mode == WebApiMode::Debug);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind the admin API to {}", config.bind))?;

    info!(
        "Admin API listening on {} (host {}, base path {}, schemes {})",
        config.bind,
        config.host,
        config.base_path,
        config.schemes.join(",")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("admin API server failed")?;

    info!("Admin API stopped");
    Ok(())
}

/// Drop every memoized listing, e.g. after a component was toggled.
pub fn invalidate_responses(cache: &CacheRegistry) {
    match response_cache(cache) {
        Ok(responses) => {
            responses.invalidate_all();
            debug!("Admin API response cache cleared");
        }
        Err(e) => warn!("Failed to clear the admin API response cache: {}", e),
    }
}

fn response_cache(cache: &CacheRegistry) -> Result<TypedCache<String, Value>, CacheError> {
    cache.get_or_create(RESPONSE_CACHE, CacheConfig::with_capacity(256))
}

/// Serve `key` from the response cache, building and storing it on a miss.
async fn cached<T, F, Fut>(state: &AppState, key: &str, build: F) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let responses = match response_cache(&state.cache) {
        Ok(responses) => Some(responses),
        Err(e) => {
            warn!("Admin API response cache unavailable: {}", e);
            None
        }
    };

    let key = key.to_string();
    if let Some(hit) = responses.as_ref().and_then(|r| r.get(&key)) {
        if let Ok(value) = serde_json::from_value(hit) {
            return Ok(value);
        }
    }

    let fresh = build().await?;
    if let Some(responses) = responses {
        match serde_json::to_value(&fresh) {
            Ok(value) => responses.insert(key, value),
            Err(e) => warn!("Failed to cache admin API response: {}", e),
        }
    }

    Ok(fresh)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "Not found",
        format!("No route matches {}", uri.path()),
    )
}

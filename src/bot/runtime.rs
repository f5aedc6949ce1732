//! Bot runtime - bootstrap and shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::AppState;
use crate::cache::CacheRegistry;
use crate::config::{Config, WebApiMode};
use crate::database::{Database, EntityManager, SqlStore};
use crate::discord::DiscordSession;
use crate::plugins;
use crate::webapi;

/// How often expired cache entries are evicted.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long the admin API may take to drain on shutdown.
const WEBAPI_SHUTDOWN_WINDOW: Duration = Duration::from_secs(10);

/// Run the bot until Ctrl+C.
///
/// Components load before the gateway connects so their `Ready`
/// handlers see the first `READY`.
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("Connecting to {:?} database...", config.database_mode);
    let store = SqlStore::connect(&config.database_url, config.database_mode)
        .await
        .context("failed to connect to the database")?;
    let db = Database::new(Arc::new(store));

    let cache = Arc::new(CacheRegistry::new());
    cache.enable_auto_cleanup(CACHE_SWEEP_INTERVAL)?;

    let entities = EntityManager::new(db, &cache, config.cache_ttl)?;
    entities
        .register_default_entities()
        .await
        .context("failed to migrate the database schema")?;
    let entities = Arc::new(entities);

    let session = DiscordSession::new(&config.token);
    let state = AppState::new(entities, cache.clone(), session.clone());

    plugins::register_all(&state.components);
    info!("{} components declared", state.components.len());

    state
        .components
        .sync_registered_components(&state.entities)
        .await;
    state.commands.init(state.session.as_ref())?;
    state.components.load(&state).await;

    let (stop_webapi, webapi_shutdown) = watch::channel(false);
    let webapi = match config.webapi.mode {
        WebApiMode::Test => {
            info!("Admin API disabled in test mode");
            None
        }
        _ => Some(tokio::spawn(webapi::serve(
            state.clone(),
            config.webapi.clone(),
            webapi_shutdown,
        ))),
    };

    info!("Connecting to Discord...");
    if let Err(e) = session.open().await {
        error!("Failed to open the Discord session: {}", e);
        shutdown(&state, &session, &cache, &stop_webapi, webapi).await;
        return Err(e.into());
    }
    info!("Bot is up and running, press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutdown requested");

    shutdown(&state, &session, &cache, &stop_webapi, webapi).await;
    Ok(())
}

async fn shutdown(
    state: &AppState,
    session: &DiscordSession,
    cache: &CacheRegistry,
    stop_webapi: &watch::Sender<bool>,
    webapi: Option<tokio::task::JoinHandle<anyhow::Result<()>>>,
) {
    state.status.stop();
    state.components.unload(state).await;
    session.close().await;

    stop_webapi.send_replace(true);
    if let Some(mut webapi) = webapi {
        match tokio::time::timeout(WEBAPI_SHUTDOWN_WINDOW, &mut webapi).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!("Admin API failed: {:#}", e),
            Ok(Err(e)) => error!("Admin API task panicked: {}", e),
            Err(_) => {
                warn!(
                    "Admin API did not stop within {:?}, aborting",
                    WEBAPI_SHUTDOWN_WINDOW
                );
                webapi.abort();
            }
        }
    }

    cache.disable_auto_cleanup();
    info!("Shutdown complete");
}

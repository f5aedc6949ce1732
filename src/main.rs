//! componentbot - Modular Discord bot host
//!
//! Features are shipped as components that register event handlers and
//! slash commands and can be toggled per guild.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - Entity store (SQLite/Postgres via sqlx) and repositories
//! - `cache` - Named typed caches with Moka
//! - `platform` - Chat platform abstraction, `discord` implements it
//! - `components` - Component declarations, enablement, load order
//! - `events` - Component event handlers and decorators
//! - `commands` - Slash command registry and sync
//! - `bot` - Shared state, audit log, status rotation, runtime
//! - `plugins` - Shipped components (extensible)
//! - `webapi` - Read-only admin HTTP API
//! - `utils` - Utility functions

mod bot;
mod cache;
mod commands;
mod components;
mod config;
mod database;
mod discord;
mod events;
mod platform;
mod plugins;
mod utils;
mod webapi;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("componentbot=info,sqlx=warn,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting componentbot {}...", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    info!("Configuration loaded successfully");
    info!("Database mode: {:?}", config.database_mode);

    bot::run(config).await
}

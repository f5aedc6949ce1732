//! Cache module - Modular caching system using Moka.
//!
//! Persistence reads are memoized here and invalidated on writes.
//!
//! ## Architecture
//!
//! The cache system follows a registry pattern:
//! - `CacheRegistry` - Central registry holding all named caches and the sweeper
//! - `TypedCache` - One typed cache per entity kind (guilds, statuses, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let guilds = registry.get_or_create::<String, Guild>("guilds", CacheConfig::default())?;
//!
//! guilds.insert("42".to_string(), guild);
//! let guild = guilds.get(&"42".to_string());
//! ```

mod config;
mod registry;
mod typed;

use thiserror::Error;

pub use config::CacheConfig;
pub use registry::CacheRegistry;
pub use typed::TypedCache;

/// Errors raised by the cache registry.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache '{name}' already exists with type {found}, requested {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("the cache sweeper is already running")]
    SweeperAlreadyRunning,
}

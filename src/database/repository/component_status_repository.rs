//! Global and per-guild component status repositories.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::warn;

use super::EntityResult;
use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::component_status::{COLUMN_COMPONENT_ID, COLUMN_GUILD_ID};
use crate::database::models::{GlobalComponentStatus, GuildComponentStatus};

pub const GLOBAL_STATUS_ENABLED_DISPLAY: &str = ":white_check_mark:";
pub const GLOBAL_STATUS_DISABLED_DISPLAY: &str = ":no_entry:";
pub const GUILD_STATUS_ENABLED_DISPLAY: &str = ":white_check_mark:";
pub const GUILD_STATUS_DISABLED_DISPLAY: &str = ":x:";

/// Repository for the bot-wide component switch, keyed by component id.
pub struct GlobalComponentStatusRepository {
    db: Database,
    cache: TypedCache<String, GlobalComponentStatus>,
}

impl GlobalComponentStatusRepository {
    pub fn new(db: &Database, cache: &CacheRegistry, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            db: db.clone(),
            cache: cache
                .get_or_create("global_component_statuses", CacheConfig::entities(1_000, ttl))?,
        })
    }

    pub async fn get(&self, component_id: i64) -> EntityResult<GlobalComponentStatus> {
        let key = component_id.to_string();
        if let Some(status) = self.cache.get(&key) {
            return Ok(status);
        }

        let status: GlobalComponentStatus = self
            .db
            .get_first(&[(COLUMN_COMPONENT_ID, json!(component_id))])
            .await?;
        self.cache.insert(key, status.clone());

        Ok(status)
    }

    pub async fn count(&self) -> EntityResult<i64> {
        Ok(self.db.count::<GlobalComponentStatus>(&[]).await?)
    }

    pub async fn create(&self, status: &mut GlobalComponentStatus) -> EntityResult<()> {
        self.db.create(status).await?;
        self.cache.invalidate(&status.component_id.to_string());

        Ok(())
    }

    pub async fn save(&self, status: &mut GlobalComponentStatus) -> EntityResult<()> {
        self.db.save(status).await?;
        self.cache.invalidate(&status.component_id.to_string());

        Ok(())
    }

    pub async fn update(
        &self,
        status: &mut GlobalComponentStatus,
        column: &'static str,
        value: impl Into<Value>,
    ) -> EntityResult<()> {
        self.db.update_column(status, column, value).await?;
        self.cache.invalidate(&status.component_id.to_string());

        Ok(())
    }

    /// Emoji rendering of the global status used in embeds.
    pub async fn get_display(&self, component_id: i64) -> &'static str {
        match self.get(component_id).await {
            Ok(status) if status.enabled => GLOBAL_STATUS_ENABLED_DISPLAY,
            Ok(_) => GLOBAL_STATUS_DISABLED_DISPLAY,
            Err(e) => {
                if !e.is_not_found() {
                    warn!("Failed to read global status of component {}: {}", component_id, e);
                }
                GLOBAL_STATUS_DISABLED_DISPLAY
            }
        }
    }
}

/// Repository for per-guild enablement, keyed by `<guildId>_<componentId>`.
pub struct GuildComponentStatusRepository {
    db: Database,
    cache: TypedCache<String, GuildComponentStatus>,
}

fn guild_status_key(guild_id: i64, component_id: i64) -> String {
    format!("{guild_id}_{component_id}")
}

impl GuildComponentStatusRepository {
    pub fn new(db: &Database, cache: &CacheRegistry, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            db: db.clone(),
            cache: cache
                .get_or_create("guild_component_statuses", CacheConfig::entities(50_000, ttl))?,
        })
    }

    /// `guild_id` is the database id of the guild row.
    pub async fn get(&self, guild_id: i64, component_id: i64) -> EntityResult<GuildComponentStatus> {
        let key = guild_status_key(guild_id, component_id);
        if let Some(status) = self.cache.get(&key) {
            return Ok(status);
        }

        let status: GuildComponentStatus = self
            .db
            .get_first(&[
                (COLUMN_GUILD_ID, json!(guild_id)),
                (COLUMN_COMPONENT_ID, json!(component_id)),
            ])
            .await?;
        self.cache.insert(key, status.clone());

        Ok(status)
    }

    pub async fn count(&self) -> EntityResult<i64> {
        Ok(self.db.count::<GuildComponentStatus>(&[]).await?)
    }

    pub async fn create(&self, status: &mut GuildComponentStatus) -> EntityResult<()> {
        self.db.create(status).await?;
        self.invalidate(status);

        Ok(())
    }

    pub async fn save(&self, status: &mut GuildComponentStatus) -> EntityResult<()> {
        self.db.save(status).await?;
        self.invalidate(status);

        Ok(())
    }

    pub async fn update(
        &self,
        status: &mut GuildComponentStatus,
        column: &'static str,
        value: impl Into<Value>,
    ) -> EntityResult<()> {
        self.db.update_column(status, column, value).await?;
        self.invalidate(status);

        Ok(())
    }

    /// Emoji rendering of the guild status used in embeds.
    pub async fn get_display(&self, guild_id: i64, component_id: i64) -> &'static str {
        match self.get(guild_id, component_id).await {
            Ok(status) if status.enabled => GUILD_STATUS_ENABLED_DISPLAY,
            Ok(_) => GUILD_STATUS_DISABLED_DISPLAY,
            Err(e) => {
                if !e.is_not_found() {
                    warn!(
                        "Failed to read status of component {} on guild {}: {}",
                        component_id, guild_id, e
                    );
                }
                GUILD_STATUS_DISABLED_DISPLAY
            }
        }
    }

    fn invalidate(&self, status: &GuildComponentStatus) {
        self.cache
            .invalidate(&guild_status_key(status.guild_id, status.component_id));
    }
}

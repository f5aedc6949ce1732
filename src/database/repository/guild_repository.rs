//! Guild repository.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use super::{EntityResult, parse_snowflake};
use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::Guild;
use crate::database::models::guild::COLUMN_GUILD_ID;

/// Repository for guilds, keyed by their platform id.
pub struct GuildRepository {
    db: Database,
    cache: TypedCache<String, Guild>,
}

impl GuildRepository {
    pub fn new(db: &Database, cache: &CacheRegistry, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            db: db.clone(),
            cache: cache.get_or_create("guilds", CacheConfig::entities(10_000, ttl))?,
        })
    }

    /// Get a guild by its platform id (decimal string).
    pub async fn get(&self, guild_id: &str) -> EntityResult<Guild> {
        let guild_id = parse_snowflake(guild_id)?;
        let key = guild_id.to_string();

        if let Some(guild) = self.cache.get(&key) {
            return Ok(guild);
        }

        let guild: Guild = self
            .db
            .get_first(&[(COLUMN_GUILD_ID, json!(guild_id))])
            .await?;
        self.cache.insert(key, guild.clone());

        Ok(guild)
    }

    pub async fn count(&self) -> EntityResult<i64> {
        Ok(self.db.count::<Guild>(&[]).await?)
    }

    pub async fn create(&self, guild: &mut Guild) -> EntityResult<()> {
        self.db.create(guild).await?;
        self.invalidate(guild);
        debug!("Created guild {} ({})", guild.guild_id, guild.name);

        Ok(())
    }

    pub async fn save(&self, guild: &mut Guild) -> EntityResult<()> {
        self.db.save(guild).await?;
        self.invalidate(guild);

        Ok(())
    }

    pub async fn update(
        &self,
        guild: &mut Guild,
        column: &'static str,
        value: impl Into<Value>,
    ) -> EntityResult<()> {
        self.db.update_column(guild, column, value).await?;
        self.invalidate(guild);

        Ok(())
    }

    fn invalidate(&self, guild: &Guild) {
        self.cache.invalidate(&guild.guild_id.to_string());
    }
}

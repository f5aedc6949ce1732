//! Audit log repositories.

use std::time::Duration;

use serde_json::{Value, json};

use super::EntityResult;
use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::database::models::audit_log::COLUMN_GUILD_ID;
use crate::database::models::{AuditLog, AuditLogConfig};
use crate::database::{Database, Order};

/// Repository for per-guild audit log settings, keyed by guild row id.
pub struct AuditLogConfigRepository {
    db: Database,
    cache: TypedCache<String, AuditLogConfig>,
}

impl AuditLogConfigRepository {
    pub fn new(db: &Database, cache: &CacheRegistry, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            db: db.clone(),
            cache: cache.get_or_create("audit_log_configs", CacheConfig::entities(5_000, ttl))?,
        })
    }

    /// Configuration of a guild (by database id).
    ///
    /// Absence is not an error: an unsaved, disabled config is returned.
    pub async fn get_by_guild_id(&self, guild_id: i64) -> EntityResult<AuditLogConfig> {
        let key = guild_id.to_string();
        if let Some(config) = self.cache.get(&key) {
            return Ok(config);
        }

        match self
            .db
            .get_first::<AuditLogConfig>(&[(COLUMN_GUILD_ID, json!(guild_id))])
            .await
        {
            Ok(config) => {
                self.cache.insert(key, config.clone());
                Ok(config)
            }
            Err(e) if e.is_not_found() => Ok(AuditLogConfig {
                guild_id,
                ..Default::default()
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create(&self, config: &mut AuditLogConfig) -> EntityResult<()> {
        self.db.create(config).await?;
        self.cache.invalidate(&config.guild_id.to_string());

        Ok(())
    }

    pub async fn save(&self, config: &mut AuditLogConfig) -> EntityResult<()> {
        self.db.save(config).await?;
        self.cache.invalidate(&config.guild_id.to_string());

        Ok(())
    }

    pub async fn update(
        &self,
        config: &mut AuditLogConfig,
        column: &'static str,
        value: impl Into<Value>,
    ) -> EntityResult<()> {
        self.db.update_column(config, column, value).await?;
        self.cache.invalidate(&config.guild_id.to_string());

        Ok(())
    }
}

/// Append-only audit log repository. Entries are never cached.
pub struct AuditLogRepository {
    db: Database,
}

impl AuditLogRepository {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, entry: &mut AuditLog) -> EntityResult<()> {
        Ok(self.db.create(entry).await?)
    }

    pub async fn count(&self) -> EntityResult<i64> {
        Ok(self.db.count::<AuditLog>(&[]).await?)
    }

    /// Most recent entries of a guild, newest first.
    #[allow(dead_code)]
    pub async fn latest_for_guild(&self, guild_id: i64, limit: u32) -> EntityResult<Vec<AuditLog>> {
        Ok(self
            .db
            .query::<AuditLog>()
            .filter(COLUMN_GUILD_ID, guild_id)
            .order_by("id", Order::Desc)
            .limit(limit)
            .fetch_all()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::models::{AuditLog, Guild, RegisteredComponent};
    use crate::database::repository::testing::entity_manager;

    #[tokio::test]
    async fn test_missing_config_is_zeroed() {
        let em = entity_manager().await;

        let config = em.audit_log_configs().get_by_guild_id(5).await.unwrap();
        assert_eq!(config.id, 0);
        assert_eq!(config.guild_id, 5);
        assert!(!config.enabled);
        assert_eq!(config.channel_id, None);
    }

    #[tokio::test]
    async fn test_config_save_and_log_append() {
        let em = entity_manager().await;
        let mut guild = Guild::new(1, "g");
        em.guilds().create(&mut guild).await.unwrap();
        let mut component = RegisteredComponent {
            code: "bot_core".into(),
            ..Default::default()
        };
        em.registered_components().create(&mut component).await.unwrap();

        let mut config = em.audit_log_configs().get_by_guild_id(guild.id).await.unwrap();
        config.enabled = true;
        config.channel_id = Some(99);
        em.audit_log_configs().save(&mut config).await.unwrap();

        let stored = em.audit_log_configs().get_by_guild_id(guild.id).await.unwrap();
        assert!(stored.enabled);
        assert_eq!(stored.channel_id, Some(99));

        for message in ["first", "second"] {
            em.audit_logs()
                .create(&mut AuditLog {
                    guild_id: guild.id,
                    component_id: component.id,
                    user_id: 7,
                    message: message.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let latest = em.audit_logs().latest_for_guild(guild.id, 1).await.unwrap();
        assert_eq!(latest[0].message, "second");
        assert_eq!(em.audit_logs().count().await.unwrap(), 2);
    }
}

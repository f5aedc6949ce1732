//! Audit trail of administrative actions.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::components::Component;
use crate::database::EntityManager;
use crate::database::models::AuditLog;
use crate::database::repository::parse_snowflake;
use crate::platform::{Embed, MessageSend, PlatformSession, User};

/// Writes audit log entries on behalf of one component.
#[derive(Clone)]
pub struct AuditLogger {
    component: Arc<Component>,
    entities: Arc<EntityManager>,
    session: Arc<dyn PlatformSession>,
}

impl AuditLogger {
    pub fn new(
        component: Arc<Component>,
        entities: Arc<EntityManager>,
        session: Arc<dyn PlatformSession>,
    ) -> Self {
        Self {
            component,
            entities,
            session,
        }
    }

    /// Record an action taken by `user` on a guild.
    ///
    /// With `announce` set, the entry is also posted to the guild's audit
    /// log channel when one is configured and enabled. A failed post only
    /// logs a warning.
    pub async fn log(
        &self,
        guild_id: &str,
        user: &User,
        message: impl Into<String>,
        announce: bool,
    ) -> anyhow::Result<AuditLog> {
        let code = self.component.code;
        let guild = self
            .entities
            .guilds()
            .get(guild_id)
            .await
            .with_context(|| format!("guild {guild_id} is not known"))?;
        let registered = self
            .entities
            .registered_components()
            .get(code)
            .await
            .with_context(|| format!("component {code} is not registered"))?;

        let mut entry = AuditLog {
            guild_id: guild.id,
            component_id: registered.id,
            user_id: parse_snowflake(&user.id)?,
            message: message.into(),
            ..Default::default()
        };
        self.entities.audit_logs().create(&mut entry).await?;
        debug!(component = code, "Audit log on guild {}: {}", guild_id, entry.message);

        if announce {
            self.announce(guild.id, user, &entry).await;
        }

        Ok(entry)
    }

    async fn announce(&self, guild_db_id: i64, user: &User, entry: &AuditLog) {
        let code = self.component.code;
        let config = match self.entities.audit_log_configs().get_by_guild_id(guild_db_id).await {
            Ok(config) => config,
            Err(e) => {
                warn!(component = code, "Failed to read audit log config: {}", e);
                return;
            }
        };
        let Some(channel_id) = config.channel_id.filter(|_| config.enabled) else {
            return;
        };

        let embed = Embed::new()
            .title("Bot Audit Log")
            .color(Embed::COLOR_INFO)
            .field("Component", self.component.name, false)
            .field("User", user.mention(), true)
            .field("Message", entry.message.clone(), false)
            .timestamp_now();

        if let Err(e) = self
            .session
            .send_message(&channel_id.to_string(), MessageSend::embed(embed))
            .await
        {
            warn!(component = code, "Failed to announce audit log entry: {}", e);
        }
    }
}

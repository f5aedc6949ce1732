//! `/jojo auditlog ...`

use tracing::warn;

use super::CODE;
use super::jojo::{Jojo, Request, generic_error, template};
use crate::database::models::AuditLogConfig;
use crate::database::repository::parse_snowflake;
use crate::platform::MessageSend;

fn channel_mention(channel_id: u64) -> String {
    format!("<#{channel_id}>")
}

impl Jojo {
    pub(super) async fn audit_log_status(&self, request: &Request) -> anyhow::Result<()> {
        let title = "Bot Audit Log";
        let Some(config) = self.audit_log_config(request).await else {
            return request.respond_public(generic_error(title)).await;
        };

        let enabled = if config.enabled { ":white_check_mark:" } else { ":x:" };
        let channel = config
            .channel_id
            .map(channel_mention)
            .unwrap_or_else(|| "Not configured!".to_string());

        let embed = template(title)
            .field("Enabled", enabled, false)
            .field("Configured Channel", channel, false);
        request.respond_public(embed).await
    }

    pub(super) async fn audit_log_enable(&self, request: &Request) -> anyhow::Result<()> {
        let title = "Enable Bot Audit Log";
        let channel = match request.option("channel").map(parse_snowflake).transpose() {
            Ok(channel) => channel,
            Err(e) => {
                warn!(component = CODE, "Invalid audit log channel: {}", e);
                return request.respond(generic_error(title)).await;
            }
        };
        let Some(mut config) = self.audit_log_config(request).await else {
            return request.respond(generic_error(title)).await;
        };

        if config.enabled && config.channel_id.is_some() && channel.is_none_or(|c| Some(c) == config.channel_id) {
            let current = config.channel_id.map(channel_mention).unwrap_or_default();
            let embed = template(title).field(
                ":x: Nothing to do here!",
                format!("The bot audit log is already enabled and configured to use the channel {current}!"),
                false,
            );
            return request.respond(embed).await;
        }

        if channel.is_some() {
            config.channel_id = channel;
        }
        let Some(channel_id) = config.channel_id else {
            let embed = template(title).field(
                ":x: Whoops, no bot audit log without a channel!",
                "To enable the bot audit log for the first time, you must enter a valid channel to write the logs to!",
                false,
            );
            return request.respond(embed).await;
        };

        config.enabled = true;
        if let Err(e) = self.ctx.entities().audit_log_configs().save(&mut config).await {
            warn!(component = CODE, "Failed to save audit log config of guild {}: {}", request.guild_id, e);
            return request.respond(generic_error(title)).await;
        }

        let mention = channel_mention(channel_id);
        let notice = format!(
            ":white_check_mark: {} configured this channel to receive future bot audit log messages.\n\n\
             If this channel was chosen by accident and you want to reconfigure the bot audit log, use the \
             command `/jojo auditlog enable <channel>` to do so!\n\
             If this action was unintended, use the command `/jojo auditlog disable` to disable the bot audit log.",
            request.user.mention()
        );
        if let Err(e) = request
            .session
            .send_message(&channel_id.to_string(), MessageSend::text(notice))
            .await
        {
            warn!(
                component = CODE,
                "Failed to notify channel {} on guild {} about the audit log: {}", channel_id, request.guild_id, e
            );
        }

        let responded = request
            .respond(template(title).field(
                ":white_check_mark: Done!",
                format!("The bot audit log is now enabled and configured to use the channel {mention}!"),
                false,
            ))
            .await;
        self.audit(
            request,
            format!("The bot audit log announcements have been enabled for channel {mention}!"),
            false,
        )
        .await;

        responded
    }

    pub(super) async fn audit_log_disable(&self, request: &Request) -> anyhow::Result<()> {
        let title = "Disable Bot Audit Log";
        let Some(mut config) = self.audit_log_config(request).await else {
            return request.respond_public(generic_error(title)).await;
        };

        if config.id == 0 {
            let embed = template(title).field(
                ":x: Oh no, no configuration could be found!",
                "The bot audit log is already disabled, as it has not been configured before!",
                false,
            );
            return request.respond_public(embed).await;
        }
        if !config.enabled {
            let embed = template(title).field(
                ":x: Nothing to do here!",
                "The bot audit log is already disabled!",
                false,
            );
            return request.respond_public(embed).await;
        }

        config.enabled = false;
        config.channel_id = None;
        if let Err(e) = self.ctx.entities().audit_log_configs().save(&mut config).await {
            warn!(component = CODE, "Failed to save audit log config of guild {}: {}", request.guild_id, e);
            return request.respond_public(generic_error(title)).await;
        }

        let responded = request
            .respond_public(template(title).field(
                ":white_check_mark: Done!",
                "The bot audit log is now disabled! You can enable it again at any time!",
                false,
            ))
            .await;
        self.audit(request, "The bot audit log announcements have been disabled!", false)
            .await;

        responded
    }

    /// Stored configuration of the invoking guild, or an unsaved default.
    async fn audit_log_config(&self, request: &Request) -> Option<AuditLogConfig> {
        let guild = self.guild(request).await?;
        match self
            .ctx
            .entities()
            .audit_log_configs()
            .get_by_guild_id(guild.id)
            .await
        {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(component = CODE, "Failed to read audit log config of guild {}: {}", request.guild_id, e);
                None
            }
        }
    }
}

//! `/jojo module ...`

use std::fmt::Write;

use tracing::warn;

use super::CODE;
use super::jojo::{Jojo, Request, TOGGLE_LIMIT, generic_error, template};
use crate::database::EntityResult;
use crate::database::models::component_status::COLUMN_ENABLED;
use crate::database::models::{Guild, GuildComponentStatus, RegisteredComponent};
use crate::database::repository::{
    GLOBAL_STATUS_DISABLED_DISPLAY, GLOBAL_STATUS_ENABLED_DISPLAY, GUILD_STATUS_DISABLED_DISPLAY,
};
use crate::platform::Embed;

fn missing_module(title: &str, name: &str) -> Embed {
    template(title).field(
        ":x: Error",
        format!("No module with name \"{name}\" could be found!"),
        false,
    )
}

impl Jojo {
    pub(super) async fn module_list(&self, request: &Request) -> anyhow::Result<()> {
        let entities = self.ctx.entities();
        let guild = self.guild(request).await;

        let mut table = String::new();
        for registered in entities.registered_components().get_available().await {
            if registered.is_core() {
                continue;
            }
            let status = self.status_display(&registered, guild.as_ref()).await;
            let _ = writeln!(table, "{} - {}", status, registered.name);
        }
        if table.is_empty() {
            table.push_str("No modules available");
        }

        let legend = format!(
            "{GLOBAL_STATUS_ENABLED_DISPLAY} - Enabled\n\
             {GUILD_STATUS_DISABLED_DISPLAY} - Disabled\n\
             {GLOBAL_STATUS_DISABLED_DISPLAY} - Globally disabled (Maintenance)"
        );
        let embed = template("Module Status")
            .description("Overview of all modules and whether they are enabled or not")
            .field("Status - Module", table, true)
            .field("Legend", legend, false);

        request.respond(embed).await
    }

    pub(super) async fn module_show(&self, request: &Request) -> anyhow::Result<()> {
        let title = "Module Information";
        let Some(registered) = self.find_module(request).await else {
            let name = request.option("module").unwrap_or_default();
            return request.respond(missing_module(title, name)).await;
        };
        let Some(guild) = self.guild(request).await else {
            return request.respond(missing_module(title, &registered.name)).await;
        };

        let entities = self.ctx.entities();
        let global = entities
            .global_component_statuses()
            .get_display(registered.id)
            .await;
        let local = entities
            .guild_component_statuses()
            .get_display(guild.id, registered.id)
            .await;

        let description = match registered.description.as_str() {
            "" => "-",
            description => description,
        };
        let embed = template(title)
            .field("Name", &registered.name, false)
            .field("Description", description, false)
            .field("Guild Status", local, true)
            .field("Global Status", global, true);

        request.respond_public(embed).await
    }

    /// Enable or disable a feature component on the invoking guild.
    pub(super) async fn module_toggle(&self, request: &Request, enable: bool) -> anyhow::Result<()> {
        let (title, action) = if enable {
            ("Enable Module", "enabled")
        } else {
            ("Disable Module", "disabled")
        };

        let Some(registered) = self.find_module(request).await else {
            let name = request.option("module").unwrap_or_default();
            return request.respond(missing_module(title, name)).await;
        };
        let Some(guild) = self.guild(request).await else {
            return request.respond(missing_module(title, &registered.name)).await;
        };

        if !self.toggles.try_acquire(&request.guild_id) {
            let embed = template(title).field(
                ":x: Slow down my friend!",
                format!(
                    "The `/jojo module enable` and `/jojo module disable` commands can only be \
                     used up to {TOGGLE_LIMIT} times in 10 minutes per guild!"
                ),
                false,
            );
            return request.respond(embed).await;
        }

        match self.set_module_status(&guild, &registered, enable).await {
            Ok(true) => {}
            Ok(false) => {
                let embed = template(title).field(
                    ":x: Error",
                    format!("Module with name \"{}\" is already {action}!", registered.name),
                    false,
                );
                return request.respond(embed).await;
            }
            Err(e) => {
                warn!(
                    component = CODE,
                    "Failed to {} {} on guild {}: {}",
                    if enable { "enable" } else { "disable" },
                    registered.code,
                    request.guild_id,
                    e
                );
                return request.respond(generic_error(title)).await;
            }
        }

        let status = if enable {
            ":white_check_mark: - The module has been enabled!"
        } else {
            ":x: - The module has been disabled!"
        };
        let responded = request
            .respond(
                template(title)
                    .field("Module", &registered.name, false)
                    .field("Status", status, false),
            )
            .await;

        self.resync(request).await;
        self.audit(
            request,
            format!("The component `{}` has been {action}", registered.name),
            true,
        )
        .await;

        responded
    }

    /// Selected feature component. Core components are never offered.
    async fn find_module(&self, request: &Request) -> Option<RegisteredComponent> {
        let code = request.option("module")?;
        self.ctx
            .entities()
            .registered_components()
            .get_available()
            .await
            .into_iter()
            .find(|c| c.code == code && !c.is_core())
    }

    /// Write the guild status. Returns `false` when it already had the
    /// requested value.
    async fn set_module_status(
        &self,
        guild: &Guild,
        registered: &RegisteredComponent,
        enable: bool,
    ) -> EntityResult<bool> {
        let statuses = self.ctx.entities().guild_component_statuses();

        match statuses.get(guild.id, registered.id).await {
            Ok(mut status) => {
                if status.enabled == enable {
                    return Ok(false);
                }
                statuses.update(&mut status, COLUMN_ENABLED, enable).await?;
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                if !enable {
                    return Ok(false);
                }
                let mut status = GuildComponentStatus::new(guild.id, registered.id, true);
                statuses.create(&mut status).await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Guild status, unless the component is globally disabled.
    async fn status_display(&self, registered: &RegisteredComponent, guild: Option<&Guild>) -> &'static str {
        let entities = self.ctx.entities();
        let global = entities
            .global_component_statuses()
            .get_display(registered.id)
            .await;
        if global == GLOBAL_STATUS_DISABLED_DISPLAY {
            return global;
        }

        match guild {
            Some(guild) => {
                entities
                    .guild_component_statuses()
                    .get_display(guild.id, registered.id)
                    .await
            }
            None => GUILD_STATUS_DISABLED_DISPLAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::jojo::testing::{field_values, invoke, jojo, joined};
    use crate::components::is_enabled;
    use crate::platform::CommandScope;

    #[tokio::test]
    async fn test_list_shows_guild_status() {
        let (state, session) = joined().await;

        let response = invoke(&state, &session, jojo(&["module", "list"], &[])).await;

        assert!(response.ephemeral);
        assert_eq!(response.embeds[0].title.as_deref(), Some("Module Status"));
        assert_eq!(field_values(&response)[0], ":white_check_mark: - Ping Pong\n");
    }

    #[tokio::test]
    async fn test_show_rejects_core_components() {
        let (state, session) = joined().await;

        let response =
            invoke(&state, &session, jojo(&["module", "show"], &[("module", "bot_core")])).await;
        assert_eq!(
            field_values(&response),
            vec!["No module with name \"bot_core\" could be found!"]
        );

        let response =
            invoke(&state, &session, jojo(&["module", "show"], &[("module", "ping_pong")])).await;
        assert!(!response.ephemeral);
        assert_eq!(response.embeds[0].fields[0].value, "Ping Pong");
        assert_eq!(response.embeds[0].fields[2].value, ":white_check_mark:");
    }

    #[tokio::test]
    async fn test_disable_then_enable_round_trip() {
        let (state, session) = joined().await;
        let scope = CommandScope::Guild("10".into());
        let ping_pong = state.components.get("ping_pong").unwrap();

        let response = invoke(
            &state,
            &session,
            jojo(&["module", "disable"], &[("module", "ping_pong")]),
        )
        .await;
        assert_eq!(field_values(&response)[1], ":x: - The module has been disabled!");
        assert!(!is_enabled(&state.entities, &ping_pong, "10").await);
        assert_eq!(session.command_names(&scope), vec!["jojo"]);
        assert_eq!(state.entities.audit_logs().count().await.unwrap(), 1);

        let response = invoke(
            &state,
            &session,
            jojo(&["module", "disable"], &[("module", "ping_pong")]),
        )
        .await;
        assert_eq!(
            field_values(&response),
            vec!["Module with name \"Ping Pong\" is already disabled!"]
        );

        invoke(
            &state,
            &session,
            jojo(&["module", "enable"], &[("module", "ping_pong")]),
        )
        .await;
        assert!(is_enabled(&state.entities, &ping_pong, "10").await);
        assert_eq!(session.command_names(&scope), vec!["jojo", "ping", "pong"]);
        assert_eq!(state.entities.audit_logs().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_toggles_are_rate_limited_per_guild() {
        let (state, session) = joined().await;

        for i in 0..10 {
            let sub = if i % 2 == 0 { "disable" } else { "enable" };
            invoke(&state, &session, jojo(&["module", sub], &[("module", "ping_pong")])).await;
        }
        let response = invoke(
            &state,
            &session,
            jojo(&["module", "disable"], &[("module", "ping_pong")]),
        )
        .await;

        assert_eq!(response.embeds[0].fields[0].name, ":x: Slow down my friend!");
        let ping_pong = state.components.get("ping_pong").unwrap();
        assert!(is_enabled(&state.entities, &ping_pong, "10").await);
    }
}

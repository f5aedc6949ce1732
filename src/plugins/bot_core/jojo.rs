//! The `/jojo` command: module management, manual command sync and the
//! bot audit log settings of a guild.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{CODE, RateLimiter};
use crate::commands::Command;
use crate::components::ComponentContext;
use crate::database::models::{Guild, RegisteredComponent};
use crate::platform::{
    ApplicationCommand, CommandOption, CommandScope, Embed, Interaction, InteractionResponse,
    OptionType, PlatformSession, User,
};
use crate::webapi;

/// Module toggles allowed per guild within [`TOGGLE_WINDOW`].
pub const TOGGLE_LIMIT: usize = 10;
pub const TOGGLE_WINDOW: Duration = Duration::from_secs(10 * 60);
/// Minimum time between two manual command syncs of a guild.
pub const SYNC_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// State shared by every `/jojo` invocation.
pub(super) struct Jojo {
    pub(super) ctx: ComponentContext,
    pub(super) toggles: RateLimiter,
    syncs: RateLimiter,
}

/// One `/jojo` invocation on a guild.
pub(super) struct Request {
    pub(super) session: Arc<dyn PlatformSession>,
    pub(super) interaction: Interaction,
    pub(super) guild_id: String,
    pub(super) user: User,
}

impl Request {
    /// Reply only the invoking user sees.
    pub(super) async fn respond(&self, embed: Embed) -> anyhow::Result<()> {
        self.session
            .respond_interaction(&self.interaction, InteractionResponse::embed(embed).ephemeral())
            .await?;
        Ok(())
    }

    pub(super) async fn respond_public(&self, embed: Embed) -> anyhow::Result<()> {
        self.session
            .respond_interaction(&self.interaction, InteractionResponse::embed(embed))
            .await?;
        Ok(())
    }

    /// String value of an option of the invoked sub command.
    pub(super) fn option(&self, name: &str) -> Option<&str> {
        self.interaction
            .data
            .as_ref()
            .and_then(|data| data.string_option(name))
    }
}

/// Embed every `/jojo` reply starts from.
pub(super) fn template(title: &str) -> Embed {
    Embed::new().title(title).color(Embed::COLOR_INFO)
}

pub(super) fn generic_error(title: &str) -> Embed {
    template(title).field(
        ":x: Damn, something went wrong!",
        "Something unexpected happened while processing the command!",
        false,
    )
}

pub(super) async fn register(ctx: &ComponentContext) -> anyhow::Result<()> {
    let modules: Vec<RegisteredComponent> = ctx
        .entities()
        .registered_components()
        .get_available()
        .await
        .into_iter()
        .filter(|c| !c.is_core())
        .collect();

    let jojo = Arc::new(Jojo {
        ctx: ctx.clone(),
        toggles: RateLimiter::new(TOGGLE_LIMIT, TOGGLE_WINDOW),
        syncs: RateLimiter::new(1, SYNC_COOLDOWN),
    });

    ctx.commands().register(Command::new(
        descriptor(&modules),
        move |session: Arc<dyn PlatformSession>, interaction: Interaction| {
            let jojo = jojo.clone();
            async move { jojo.handle(session, interaction).await }
        },
    ))?;

    Ok(())
}

fn descriptor(modules: &[RegisteredComponent]) -> ApplicationCommand {
    let module_option = |description: &str| {
        modules.iter().fold(
            CommandOption::new(OptionType::String, "module", description).required(),
            |option, module| option.choice(module.name.clone(), module.code.clone()),
        )
    };

    ApplicationCommand::new("jojo", "Manage modules and core settings of the bot!")
        .option(
            CommandOption::group(
                "module",
                "Manage which modules should be enabled / disabled on your server!",
            )
            .option(CommandOption::sub_command("list", "List all modules and their status"))
            .option(
                CommandOption::sub_command("show", "Show information about a specific module")
                    .option(module_option("The name of the module to show information about")),
            )
            .option(
                CommandOption::sub_command("enable", "Enable a module for the guild")
                    .option(module_option("The name of the module to enable")),
            )
            .option(
                CommandOption::sub_command("disable", "Disable a module for the guild")
                    .option(module_option("The name of the module to disable")),
            ),
        )
        .option(CommandOption::sub_command(
            "sync-commands",
            "Trigger a re-synchronisation of slash-commands for the guild to tackle inconsistencies",
        ))
        .option(
            CommandOption::group("auditlog", "Manage the bot audit log of the guild")
                .option(CommandOption::sub_command(
                    "status",
                    "Show whether the bot audit log is enabled and where it is written to",
                ))
                .option(
                    CommandOption::sub_command("enable", "Enable the bot audit log").option(
                        CommandOption::new(
                            OptionType::Channel,
                            "channel",
                            "The channel the bot audit log is written to",
                        ),
                    ),
                )
                .option(CommandOption::sub_command("disable", "Disable the bot audit log")),
        )
}

impl Jojo {
    async fn handle(
        &self,
        session: Arc<dyn PlatformSession>,
        interaction: Interaction,
    ) -> anyhow::Result<()> {
        let path: Vec<String> = match interaction.data.as_ref() {
            Some(data) => data.command_path().into_iter().map(str::to_string).collect(),
            None => return Ok(()),
        };

        let guild_id = interaction.guild_id().to_string();
        let user = match interaction.invoker() {
            Some(user) if !guild_id.is_empty() => user.clone(),
            _ => {
                session
                    .respond_interaction(
                        &interaction,
                        InteractionResponse::text("This command can only be used on a guild!")
                            .ephemeral(),
                    )
                    .await?;
                return Ok(());
            }
        };

        let request = Request {
            session,
            interaction,
            guild_id,
            user,
        };

        let path: Vec<&str> = path.iter().map(String::as_str).collect();
        match path.as_slice() {
            [_, "module", "list"] => self.module_list(&request).await,
            [_, "module", "show"] => self.module_show(&request).await,
            [_, "module", "enable"] => self.module_toggle(&request, true).await,
            [_, "module", "disable"] => self.module_toggle(&request, false).await,
            [_, "sync-commands"] => self.sync_commands(&request).await,
            [_, "auditlog", "status"] => self.audit_log_status(&request).await,
            [_, "auditlog", "enable"] => self.audit_log_enable(&request).await,
            [_, "auditlog", "disable"] => self.audit_log_disable(&request).await,
            _ => {
                request
                    .session
                    .respond_interaction(
                        &request.interaction,
                        InteractionResponse::text("The executed (sub)command is invalid or does not exist!"),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn sync_commands(&self, request: &Request) -> anyhow::Result<()> {
        let title = "Slash Command Synchronisation";
        if !self.syncs.try_acquire(&request.guild_id) {
            return request
                .respond(template(title).field(
                    ":x: Too fast!",
                    "This command can only be used once every 10 minutes!",
                    false,
                ))
                .await;
        }

        let responded = request
            .respond(template(title).field(
                ":alarm_clock: Processing...",
                "Synchronisation is in progress and can take up to a minute, please wait...",
                false,
            ))
            .await;

        info!(component = CODE, "Manual slash-command sync triggered for guild {}", request.guild_id);
        self.audit(request, "A slash-command re-sync has been triggered", true).await;
        self.resync(request).await;
        self.audit(request, "A slash-command re-sync has been finished", true).await;

        responded
    }

    /// Guild row of the invocation.
    pub(super) async fn guild(&self, request: &Request) -> Option<Guild> {
        match self.ctx.entities().guilds().get(&request.guild_id).await {
            Ok(guild) => Some(guild),
            Err(e) => {
                warn!(component = CODE, "Failed to load guild {}: {}", request.guild_id, e);
                None
            }
        }
    }

    /// Re-publish the guild's commands and drop stale admin API listings.
    pub(super) async fn resync(&self, request: &Request) {
        webapi::invalidate_responses(self.ctx.cache());
        self.ctx
            .state()
            .commands
            .sync(
                request.session.as_ref(),
                &CommandScope::Guild(request.guild_id.clone()),
            )
            .await;
    }

    pub(super) async fn audit(&self, request: &Request, message: impl Into<String>, announce: bool) {
        if let Err(e) = self
            .ctx
            .audit()
            .log(&request.guild_id, &request.user, message, announce)
            .await
        {
            warn!(
                component = CODE,
                "Failed to write audit log on guild {}: {:#}", request.guild_id, e
            );
        }
    }
}

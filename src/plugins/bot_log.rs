//! Startup and guild membership logging.

use std::sync::Arc;

use tracing::info;

use crate::components::{Category, Component, ComponentContext};
use crate::database::EntityManager;
use crate::platform::{GuildCreate, GuildDelete, PlatformSession, Ready};

pub const CODE: &str = "bot_log";

pub fn component() -> Component {
    Component::new(CODE, "Bot Log")
        .description(
            "This component prints out some basic information in the log when bot is ready or added to guilds.",
        )
        .category(Category::Internal)
        .default_enabled(true)
}

pub async fn load(ctx: ComponentContext) -> anyhow::Result<()> {
    let handlers = ctx.handlers();
    handlers.register_once("bot_ready", on_ready)?;
    handlers.register("guild_join", on_guild_join)?;

    let entities = ctx.entities().clone();
    handlers.register("guild_leave", move |_, guild: GuildDelete| {
        let entities = entities.clone();
        async move {
            on_guild_leave(&entities, guild).await;
            Ok(())
        }
    })?;

    Ok(())
}

async fn on_ready(_session: Arc<dyn PlatformSession>, ready: Ready) -> anyhow::Result<()> {
    info!(component = CODE, "Logged in as: {:?} ({})", ready.user.display_name(), ready.user.id);
    info!(component = CODE, "The bot is registered on {} guilds", ready.guilds.len());
    Ok(())
}

async fn on_guild_join(_session: Arc<dyn PlatformSession>, guild: GuildCreate) -> anyhow::Result<()> {
    info!(component = CODE, "The bot joined the guild {:?} with ID {}", guild.name, guild.id);
    Ok(())
}

async fn on_guild_leave(entities: &EntityManager, guild: GuildDelete) {
    if guild.unavailable {
        info!(component = CODE, "Guild {} became unavailable", guild.id);
        return;
    }

    let name = entities
        .guilds()
        .get(&guild.id)
        .await
        .map(|g| g.name)
        .unwrap_or_default();
    info!(component = CODE, "The bot left the guild {:?} with ID {}", name, guild.id);
}

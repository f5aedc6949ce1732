//! Guild rows and default component statuses.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use super::CODE;
use crate::bot::AppState;
use crate::components::ComponentContext;
use crate::database::EntityManager;
use crate::database::models::guild::COLUMN_NAME;
use crate::database::models::{GlobalComponentStatus, Guild, GuildComponentStatus};
use crate::database::repository::parse_snowflake;
use crate::platform::{CommandScope, GuildCreate, GuildUpdate, PlatformSession};

/// Give every available component a global status, enabled by default.
pub(super) async fn ensure_global_statuses(entities: &EntityManager) {
    let statuses = entities.global_component_statuses();

    for registered in entities.registered_components().get_available().await {
        match statuses.get(registered.id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                let mut status = GlobalComponentStatus::new(registered.id, true);
                match statuses.create(&mut status).await {
                    Ok(()) => debug!(component = CODE, "Created global status of {}", registered.code),
                    Err(e) => warn!(
                        component = CODE,
                        "Failed to create global status of {}: {}", registered.code, e
                    ),
                }
            }
            Err(e) => warn!(
                component = CODE,
                "Failed to read global status of {}: {}", registered.code, e
            ),
        }
    }
}

pub(super) fn register_handlers(ctx: &ComponentContext) -> anyhow::Result<()> {
    let handlers = ctx.handlers();

    let state = ctx.state().clone();
    handlers.register(
        "guild_join",
        move |session: Arc<dyn PlatformSession>, guild: GuildCreate| {
            let state = state.clone();
            async move { on_guild_join(&state, session.as_ref(), guild).await }
        },
    )?;

    let entities = ctx.entities().clone();
    handlers.register(
        "update_registered_guilds",
        move |_: Arc<dyn PlatformSession>, guild: GuildUpdate| {
            let entities = entities.clone();
            async move { on_guild_update(&entities, guild).await }
        },
    )?;

    Ok(())
}

async fn on_guild_join(
    state: &AppState,
    session: &dyn PlatformSession,
    guild: GuildCreate,
) -> anyhow::Result<()> {
    let stored = register_guild(&state.entities, &guild).await?;
    init_guild_statuses(&state.entities, &stored).await;
    state
        .commands
        .sync(session, &CommandScope::Guild(guild.id))
        .await;

    Ok(())
}

async fn on_guild_update(entities: &EntityManager, guild: GuildUpdate) -> anyhow::Result<()> {
    let guilds = entities.guilds();
    let mut stored = match guilds.get(&guild.id).await {
        Ok(stored) => stored,
        Err(e) if e.is_not_found() => {
            warn!(component = CODE, "Received update for unknown guild {}", guild.id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if stored.name != guild.name {
        guilds
            .update(&mut stored, COLUMN_NAME, guild.name)
            .await
            .with_context(|| format!("failed to rename guild {}", guild.id))?;
        debug!(component = CODE, "Guild {} renamed to {:?}", guild.id, stored.name);
    }

    Ok(())
}

/// Create the guild row or bring its name up to date.
async fn register_guild(entities: &EntityManager, guild: &GuildCreate) -> anyhow::Result<Guild> {
    let guilds = entities.guilds();

    match guilds.get(&guild.id).await {
        Ok(mut stored) => {
            if stored.name != guild.name {
                guilds
                    .update(&mut stored, COLUMN_NAME, guild.name.clone())
                    .await
                    .with_context(|| format!("failed to rename guild {}", guild.id))?;
            }
            Ok(stored)
        }
        Err(e) if e.is_not_found() => {
            let mut stored = Guild::new(parse_snowflake(&guild.id)?, guild.name.clone());
            guilds
                .create(&mut stored)
                .await
                .with_context(|| format!("failed to register guild {}", guild.id))?;
            info!(component = CODE, "Registered guild {:?} ({})", guild.name, guild.id);
            Ok(stored)
        }
        Err(e) => Err(e.into()),
    }
}

/// Enable default components the guild has no status for yet.
async fn init_guild_statuses(entities: &EntityManager, guild: &Guild) {
    let statuses = entities.guild_component_statuses();

    for registered in entities.registered_components().get_available().await {
        if !registered.default_enabled || registered.is_core() {
            continue;
        }

        match statuses.get(guild.id, registered.id).await {
            Ok(_) => continue,
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(
                    component = CODE,
                    "Failed to read status of {} on guild {}: {}", registered.code, guild.guild_id, e
                );
                continue;
            }
        }

        let mut status = GuildComponentStatus::new(guild.id, registered.id, true);
        if let Err(e) = statuses.create(&mut status).await {
            warn!(
                component = CODE,
                "Failed to enable {} on guild {}: {}", registered.code, guild.guild_id, e
            );
        }
    }
}

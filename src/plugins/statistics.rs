//! Bot information and runtime statistics.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::bot::AppState;
use crate::commands::Command;
use crate::components::{Category, Component, ComponentContext};
use crate::platform::{
    ApplicationCommand, BotStatus, Embed, Interaction, InteractionResponse, PlatformSession,
};
use crate::utils::format_duration;

pub const CODE: &str = "statistics";

const EMBED_COLOR: u32 = 0x5D397C;

pub fn component() -> Component {
    Component::new(CODE, "Statistics")
        .description("This Component returns statistics about the bot and the runtime.")
        .category(Category::Information)
        .default_enabled(true)
}

pub async fn load(ctx: ComponentContext) -> anyhow::Result<()> {
    let started = Instant::now();

    for name in ["info", "stats"] {
        let state = ctx.state().clone();
        ctx.commands().register(
            Command::new(
                ApplicationCommand::new(name, "Show information of the bot and runtime statistics."),
                move |session: Arc<dyn PlatformSession>, interaction: Interaction| {
                    let state = state.clone();
                    async move {
                        let embed = info_embed(&state, started).await;
                        session
                            .respond_interaction(&interaction, InteractionResponse::embed(embed))
                            .await?;
                        Ok(())
                    }
                },
            )
            .global(),
        )?;
    }

    ctx.status().add(BotStatus::listening("/info"));
    Ok(())
}

async fn info_embed(state: &AppState, started: Instant) -> Embed {
    let guilds = match state.entities.guilds().count().await {
        Ok(count) => count.to_string(),
        Err(_) => "Error".to_string(),
    };

    let mut bot = String::new();
    let _ = writeln!(bot, "Slash Commands: **{}**", state.commands.len());
    let _ = writeln!(bot, "Components: **{}**", state.components.len());
    let _ = writeln!(bot, "Version: **{}**", env!("CARGO_PKG_VERSION"));

    let mut stats = String::new();
    let _ = writeln!(stats, "Uptime: **{}**", format_duration(started.elapsed().as_secs()));
    let _ = writeln!(stats, "Connected Servers: **{}**", guilds);

    Embed::new()
        .title("Info")
        .color(EMBED_COLOR)
        .field("Bot", bot, false)
        .field("Stats", stats, false)
}

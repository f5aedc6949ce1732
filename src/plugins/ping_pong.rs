//! Ping pong plugin.
//!
//! Answers `ping` with `Pong!` and `pong` with `Ping!`, both as plain
//! messages and as slash commands.

use std::sync::Arc;

use tracing::warn;

use crate::commands::Command;
use crate::components::{Category, Component, ComponentContext};
use crate::platform::{
    ApplicationCommand, BotStatus, Interaction, InteractionResponse, Message, MessageSend,
    PlatformSession,
};

pub const CODE: &str = "ping_pong";

pub fn component() -> Component {
    Component::new(CODE, "Ping Pong")
        .description("This module plays ping pong with you and returns Latency (maybe)")
        .category(Category::Fun)
        .default_enabled(true)
}

pub async fn load(ctx: ComponentContext) -> anyhow::Result<()> {
    let handlers = ctx.handlers();
    handlers.register_simple_message_handler("ping", on_ping_message, &["ping"])?;
    handlers.register_simple_message_handler("pong", on_pong_message, &["pong"])?;

    let commands = ctx.commands();
    commands.register(Command::new(
        ApplicationCommand::new("ping", "Play ping pong with the bot!"),
        |session, interaction| reply(session, interaction, "Pong!"),
    ))?;
    commands.register(Command::new(
        ApplicationCommand::new("pong", "Play ping pong with the bot!"),
        |session, interaction| reply(session, interaction, "Ping!"),
    ))?;

    ctx.status().add(BotStatus::game("ping pong"));
    Ok(())
}

async fn on_ping_message(session: Arc<dyn PlatformSession>, msg: Message) -> anyhow::Result<()> {
    answer(session, msg, "Pong!").await
}

async fn on_pong_message(session: Arc<dyn PlatformSession>, msg: Message) -> anyhow::Result<()> {
    answer(session, msg, "Ping!").await
}

async fn answer(session: Arc<dyn PlatformSession>, msg: Message, text: &str) -> anyhow::Result<()> {
    if let Err(e) = session.send_message(&msg.channel_id, MessageSend::text(text)).await {
        warn!(component = CODE, "Failed to deliver {:?} message: {}", text, e);
    }
    Ok(())
}

async fn reply(
    session: Arc<dyn PlatformSession>,
    interaction: Interaction,
    text: &'static str,
) -> anyhow::Result<()> {
    session
        .respond_interaction(&interaction, InteractionResponse::text(text))
        .await?;
    Ok(())
}

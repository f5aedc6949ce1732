//! Core routines: guild and component bookkeeping plus the `/jojo`
//! management command.

mod audit_log;
mod guilds;
mod jojo;
mod limiter;
mod module;

use crate::components::{Category, Component, ComponentContext};
use crate::platform::BotStatus;

pub use limiter::RateLimiter;

pub const CODE: &str = "bot_core";

pub fn component() -> Component {
    Component::new(CODE, "Bot Core")
        .description("This component handles core routines and entity management.")
        .category(Category::Internal)
        .load_priority(1000)
        .default_enabled(true)
}

pub async fn load(ctx: ComponentContext) -> anyhow::Result<()> {
    guilds::ensure_global_statuses(ctx.entities()).await;
    guilds::register_handlers(&ctx)?;
    jojo::register(&ctx).await?;

    ctx.status().add(BotStatus::listening("/jojo"));
    Ok(())
}

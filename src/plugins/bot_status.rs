//! Presence rotation driver.
//!
//! Starts the [`StatusRotator`](crate::bot::StatusRotator) on the first
//! `Ready`. Other components add their statuses while loading; this one
//! loads last among the core components so they all had the chance.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::components::{Category, Component, ComponentContext};
use crate::platform::{PlatformSession, Ready};

pub const CODE: &str = "bot_status";

/// Time between two presence updates.
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub fn component() -> Component {
    Component::new(CODE, "Bot Status")
        .description("This component handles automated rotation and setting of the bot status in Discord.")
        .category(Category::Internal)
        .load_priority(-1000)
        .default_enabled(true)
        .on_unload(|ctx: ComponentContext| async move {
            if ctx.status().stop() {
                info!(component = CODE, "Bot status rotation stopped");
            }
            Ok(())
        })
}

pub async fn load(ctx: ComponentContext) -> anyhow::Result<()> {
    let rotator = ctx.status().clone();
    ctx.handlers().register_once(
        "start_status_rotation",
        move |session: Arc<dyn PlatformSession>, _: Ready| {
            let rotator = rotator.clone();
            async move {
                if rotator.is_empty() {
                    info!(component = CODE, "No bot status registered, rotation stays idle");
                }
                if rotator.start(session, ROTATION_INTERVAL) {
                    info!(component = CODE, "Bot status rotation started");
                }
                Ok(())
            }
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::app_state;
    use crate::platform::{BotStatus, Event, User};

    fn ready() -> Event {
        Event::Ready(Ready {
            user: User::default(),
            guilds: Vec::new(),
            session_id: String::new(),
            resume_gateway_url: None,
        })
    }

    #[tokio::test]
    async fn test_first_ready_starts_rotation() {
        let (state, session) = app_state().await;
        state.components.register(component(), load);
        state.status.add(BotStatus::listening("/jojo"));
        state.components.load(&state).await;

        session.deliver(ready()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(session.presences.lock().len(), 1);
        assert_eq!(session.presences.lock()[0].content, "/jojo");
        // Already running; the handler is gone anyway.
        assert!(!state.status.start(state.session.clone(), ROTATION_INTERVAL));
        assert!(state.status.stop());
    }

    #[tokio::test]
    async fn test_unload_stops_rotation() {
        let (state, session) = app_state().await;
        state.components.register(component(), load);
        state.status.add(BotStatus::game("ping pong"));
        state.components.load(&state).await;
        session.deliver(ready()).await;

        state.components.unload(&state).await;

        assert!(!state.status.stop());
        assert!(state.handlers.is_empty());
    }
}

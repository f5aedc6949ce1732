//! Whether a component may act in a guild.

use tracing::warn;

use super::Component;
use crate::database::EntityManager;

/// Core components are always enabled. Feature components need their
/// global switch on and, inside a guild, an enabled guild status row.
/// An empty `guild_id` means no guild context and only checks the
/// global switch.
///
/// Store failures count as disabled.
pub async fn is_enabled(entities: &EntityManager, component: &Component, guild_id: &str) -> bool {
    if component.is_core() {
        return true;
    }

    let registered = match entities.registered_components().get(component.code).await {
        Ok(registered) => registered,
        Err(e) => {
            warn!(
                component = component.code,
                "Component is not registered in the database, treating it as disabled: {}", e
            );
            return false;
        }
    };

    match entities.global_component_statuses().get(registered.id).await {
        Ok(status) if status.enabled => {}
        Ok(_) => return false,
        Err(e) => {
            if !e.is_not_found() {
                warn!(component = component.code, "Failed to read global status: {}", e);
            }
            return false;
        }
    }

    if guild_id.is_empty() {
        return true;
    }

    let guild = match entities.guilds().get(guild_id).await {
        Ok(guild) => guild,
        Err(e) => {
            if !e.is_not_found() {
                warn!(component = component.code, "Failed to read guild {}: {}", guild_id, e);
            }
            return false;
        }
    };

    match entities
        .guild_component_statuses()
        .get(guild.id, registered.id)
        .await
    {
        Ok(status) => status.enabled,
        Err(e) => {
            if !e.is_not_found() {
                warn!(
                    component = component.code,
                    "Failed to read status on guild {}: {}", guild_id, e
                );
            }
            false
        }
    }
}

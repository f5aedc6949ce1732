use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{ApiError, cached};
use crate::bot::AppState;
use crate::components::{Category, Component};
use crate::database::EntityResult;

/// A component with its current status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDto {
    pub code: String,
    pub name: String,
    pub categories: Vec<Category>,
    pub description: String,
    pub global_enabled: bool,
    /// Status on the guild given by `?guild=`, `false` without one.
    pub guild_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ComponentsQuery {
    guild: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ComponentsQuery>,
) -> Result<Json<Vec<ComponentDto>>, ApiError> {
    let guild_id = query.guild.unwrap_or_default();
    let key = format!("components:{guild_id}");

    let dtos = cached(&state, &key, || async {
        let mut dtos = Vec::new();
        for component in state.components.components() {
            match dto(&state, &component, &guild_id).await {
                Ok(dto) => dtos.push(dto),
                Err(e) => {
                    error!(component = component.code, "Failed to describe component: {}", e);
                    return Err(ApiError::internal(format!(
                        "Failed to load the status of component {}",
                        component.code
                    )));
                }
            }
        }
        Ok(dtos)
    })
    .await?;

    Ok(Json(dtos))
}

async fn dto(state: &AppState, component: &Component, guild_id: &str) -> EntityResult<ComponentDto> {
    let entities = &state.entities;
    let registered = entities.registered_components().get(component.code).await?;
    let global = entities.global_component_statuses().get(registered.id).await?;

    let mut guild_enabled = false;
    if !guild_id.is_empty() {
        if let Ok(guild) = entities.guilds().get(guild_id).await {
            guild_enabled = entities
                .guild_component_statuses()
                .get(guild.id, registered.id)
                .await
                .map(|status| status.enabled)
                .unwrap_or(false);
        }
    }

    Ok(ComponentDto {
        code: component.code.to_string(),
        name: component.name.to_string(),
        categories: component.categories.clone(),
        description: component.description.to_string(),
        global_enabled: global.enabled,
        guild_enabled,
    })
}

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiError, cached};
use crate::bot::AppState;
use crate::commands::CommandSummary;
use crate::components::Category;

/// A command leaf: the command itself or one of its sub commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDto {
    pub id: String,
    pub name: String,
    pub component: String,
    pub category: Category,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOptionDto {
    /// Id of the command the option belongs to.
    pub owner: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub choices: Vec<ChoiceDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDto {
    pub name: String,
    pub value: Value,
}

impl From<&CommandSummary> for CommandDto {
    fn from(summary: &CommandSummary) -> Self {
        Self {
            id: summary.id.clone(),
            name: summary.name.clone(),
            component: summary.component.clone(),
            category: summary.category,
            description: summary.description.clone(),
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CommandDto>>, ApiError> {
    let dtos = cached(&state, "commands", || async {
        Ok(state.commands.summaries().iter().map(CommandDto::from).collect())
    })
    .await?;

    Ok(Json(dtos))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommandDto>, ApiError> {
    let summary = find(&state, &id)?;
    Ok(Json(CommandDto::from(&summary)))
}

pub async fn options(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommandOptionDto>>, ApiError> {
    let summary = find(&state, &id)?;

    let options = summary
        .options
        .iter()
        .map(|option| CommandOptionDto {
            owner: summary.id.clone(),
            name: option.name.clone(),
            kind: option.kind.into(),
            choices: option
                .choices
                .iter()
                .map(|choice| ChoiceDto {
                    name: choice.name.clone(),
                    value: choice.value.clone(),
                })
                .collect(),
        })
        .collect();

    Ok(Json(options))
}

fn find(state: &AppState, id: &str) -> Result<CommandSummary, ApiError> {
    state.commands.summary(id).ok_or_else(|| {
        ApiError::not_found(
            "Failed to find the desired command",
            format!("There is no command with the id \"{id}\""),
        )
    })
}

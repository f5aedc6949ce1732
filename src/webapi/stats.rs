use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::bot::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsDto {
    pub guild_count: usize,
    pub slash_command_count: usize,
    pub version: String,
}

pub async fn get(State(state): State<AppState>) -> Json<StatsDto> {
    Json(StatsDto {
        guild_count: state.session.guild_ids().len(),
        slash_command_count: state.commands.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

use axum::extract::{Path, State};
use axum::Json;

use super::types::CharactersResponse;
use super::{parse_int, AppState};
use crate::error::AppError;

/// GET /api/characters_of_episode/:id
pub async fn get_characters_of_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CharactersResponse>, AppError> {
    let episode_id = match parse_int("id", &id) {
        Ok(id) if id > 0 => id,
        Ok(id) => {
            return Ok(Json(CharactersResponse::invalid(format!(
                "episode id must be positive (got {})",
                id
            ))))
        }
        Err(reason) => return Ok(Json(CharactersResponse::invalid(reason))),
    };

    let service = state.query.clone();
    let characters = tokio::task::spawn_blocking(move || service.characters_of(episode_id))
        .await?
        .map_err(|e| state.record_failure("get_characters_of_episode", e.into()))?;

    Ok(Json(CharactersResponse::Ok { characters }))
}

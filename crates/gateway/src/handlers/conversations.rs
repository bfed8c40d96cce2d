//! Conversation inspection handler

use super::Status;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use docqa_common::errors::Result;
use docqa_common::Turn;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub status: Status,
    pub conversation_id: String,
    pub turns: Vec<Turn>,
}

/// GET /api/conversations/{id} - snapshot of a transcript
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>> {
    let turns = state.engine.conversations().transcript(&id)?;

    Ok(Json(TranscriptResponse {
        status: Status::Success,
        conversation_id: id,
        turns,
    }))
}

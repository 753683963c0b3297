//! Assistant relay.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Longest question accepted, in characters.
const MAX_MESSAGE_CHARS: usize = 4000;

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat reply body.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Ask the assistant a question.
///
/// POST /api/assistant/chat
#[instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let message = validate_message(&request.message)?;
    let reply = state.assistant()?.reply(message).await?;
    Ok(Json(ChatReply { reply }))
}

fn validate_message(message: &str) -> Result<&str, AppError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "message cannot exceed {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

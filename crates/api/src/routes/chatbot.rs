//! Chatbot Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::AppState;

/// Chat message from the user
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Canned reply
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: &'static str,
}

/// Answer a heart-health question from the keyword table
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthContext>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        ApiError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;

    debug!(
        "Chatbot message from user {} ({} chars)",
        user.user_id,
        request.message.len()
    );
    counter!("heartwise_chatbot_messages_total").increment(1);

    Ok(Json(ChatResponse {
        response: state.chatbot.respond(&request.message),
    }))
}

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{middleware::RequestId, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_user_id() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Continue the user's conversation
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    tracing::info!(request_id = %request_id, user_id = %request.user_id, "Chat turn");

    let response = state.chat.reply(&request.user_id, &request.user_input).await;
    Json(ChatResponse { response })
}

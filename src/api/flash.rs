//! One-shot messages stored in the session for the next page view.

use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::ApiResponse;

const FLASH_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Best effort: a session store failure only loses the message.
pub async fn push(session: &Session, level: FlashLevel, message: impl Into<String>) {
    let mut messages: Vec<FlashMessage> = session
        .get(FLASH_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    messages.push(FlashMessage {
        level,
        message: message.into(),
    });

    if let Err(e) = session.insert(FLASH_KEY, messages).await {
        tracing::warn!("Failed to store flash message: {e}");
    }
}

pub async fn take(session: &Session) -> Vec<FlashMessage> {
    match session.remove::<Vec<FlashMessage>>(FLASH_KEY).await {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Failed to read flash messages: {e}");
            Vec::new()
        }
    }
}

/// GET /api/flash
/// Drain pending flash messages
pub async fn take_messages(session: Session) -> Json<ApiResponse<Vec<FlashMessage>>> {
    Json(ApiResponse::success(take(&session).await))
}

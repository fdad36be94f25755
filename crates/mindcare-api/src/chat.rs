use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use mindcare_types::api::{ChatRequest, ChatResponse, ErrorResponse};

use crate::assistant::FALLBACK_REPLY;
use crate::auth::AppState;

/// POST /chat: one stateless generation call per message. Prior turns are
/// never included; the persona block is prepended inside the assistant.
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    let Some(assistant) = &state.assistant else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "AI model is not available.".into(),
            }),
        )
            .into_response();
    };

    // Rejected before any outbound call is made
    if req.message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Empty message received.".into(),
            }),
        )
            .into_response();
    }

    let response = match assistant.generate(&req.message).await {
        Ok(text) => text,
        Err(e) => {
            error!("AI generation failed: {}", e);
            FALLBACK_REPLY.into()
        }
    };

    Json(ChatResponse { response }).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Assistant;
    use crate::auth::AppStateInner;
    use crate::counselors::CounselorDirectory;
    use crate::mailer::Mailer;
    use crate::sessions::SessionStore;
    use std::sync::Arc;

    fn state(assistant: Option<Assistant>) -> AppState {
        Arc::new(AppStateInner {
            db: Arc::new(mindcare_db::Database::open_in_memory().unwrap()),
            sessions: SessionStore::new(),
            assistant,
            mailer: Mailer::new(None, None),
            oauth: None,
            counselors: CounselorDirectory::bundled(),
        })
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_calling_out() {
        // A configured assistant, but the empty message must be rejected
        // before any request is made.
        let state = state(Some(Assistant::new("test-key".into())));

        let response = chat(
            State(state),
            Json(ChatRequest {
                message: String::new(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_assistant_disables_chat() {
        let response = chat(
            State(state(None)),
            Json(ChatRequest {
                message: "hello".into(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

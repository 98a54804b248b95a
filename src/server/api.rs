use crate::agent::{ validate_request, ChatAgent };
use crate::error::RelayError;
use crate::history::{ call_blocking, ConversationStore };
use crate::models::chat::{
    ChatReply,
    ChatRequest,
    ConversationResponse,
    ErrorResponse,
    HistoryResponse,
    StatusResponse,
};
use axum::{
    extract::{ rejection::JsonRejection, Path, State },
    http::StatusCode,
    response::{ Html, IntoResponse, Response },
    routing::{ delete, get, post },
    Json,
    Router,
};
use log::{ error, info };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

const INDEX_HTML: &str = include_str!("../../assets/index.html");

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    pub store: Arc<ConversationStore>,
}

impl AppState {
    pub fn new(agent: Arc<ChatAgent>) -> Self {
        let store = agent.store();
        Self { agent, store }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/history", get(history_handler))
        .route("/clear_history", post(clear_history_handler))
        .route("/delete_chat/{chat_id}", delete(delete_chat_handler))
        .route("/get_session_conversation/{session_id}", get(session_conversation_handler))
        .layer(cors)
        .with_state(state)
}

/// The reply shown when a chat request fails after validation.
/// The caller still gets a 200; only the text tells them something went wrong.
pub fn apology_reply(err: &RelayError) -> String {
    format!(
        "Sorry, I'm currently unable to process that request due to an internal error. Please try again later. (Error: {}...)",
        err.snippet()
    )
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Response {
    let validated = payload
        .map_err(|rejection| RelayError::Validation(rejection.body_text()))
        .and_then(|Json(req)| validate_request(req.session_id.as_deref(), req.message.as_deref()));

    let (session_id, message) = match validated {
        Ok(valid) => valid,
        Err(e) => {
            info!("Rejected chat request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatReply { reply: format!("Error: {}", e) }),
            ).into_response();
        }
    };

    match state.agent.process_message(&session_id, &message).await {
        Ok(reply) => Json(ChatReply { reply }).into_response(),
        Err(e) => {
            error!("Chat request failed for session {}: {}", session_id, e);
            Json(ChatReply { reply: apology_reply(&e) }).into_response()
        }
    }
}

async fn history_handler(State(state): State<AppState>) -> Response {
    match call_blocking(state.store, |store| store.latest_per_session()).await {
        Ok(history) => Json(HistoryResponse { history, error: None }).into_response(),
        Err(e) => {
            error!("Database Error (history): {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HistoryResponse {
                    history: Vec::new(),
                    error: Some("Could not retrieve chat history.".into()),
                }),
            ).into_response()
        }
    }
}

async fn clear_history_handler(State(state): State<AppState>) -> Response {
    match call_blocking(state.store, |store| store.clear_all()).await {
        Ok(()) => Json(StatusResponse::success()).into_response(),
        Err(e) => {
            error!("Database Error (clear_history): {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error("Failed to clear history.")),
            ).into_response()
        }
    }
}

async fn delete_chat_handler(State(state): State<AppState>, Path(chat_id): Path<i64>) -> Response {
    match call_blocking(state.store, move |store| store.delete_session_by_turn_id(chat_id)).await {
        Ok(()) => Json(StatusResponse::success()).into_response(),
        Err(e) => {
            error!("Database Error (delete_chat/{}): {}", chat_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error("Failed to delete chat.")),
            ).into_response()
        }
    }
}

async fn session_conversation_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>
) -> Response {
    let lookup = session_id.clone();
    match call_blocking(state.store, move |store| store.turns_for_session(&lookup)).await {
        Ok(conversation) if conversation.is_empty() => {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse { error: "Conversation not found for this session".into() }),
            ).into_response()
        }
        Ok(conversation) => Json(ConversationResponse { conversation }).into_response(),
        Err(e) => {
            error!("Database Error (get_session_conversation/{}): {}", session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: "Failed to retrieve conversation.".into() }),
            ).into_response()
        }
    }
}

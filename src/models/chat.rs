use serde::{ Serialize, Deserialize };

/// One stored user-message/assistant-reply pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: i64,
    pub session_id: String,
    #[serde(rename = "user")]
    pub user_text: String,
    #[serde(rename = "bot")]
    pub bot_text: String,
    pub timestamp: String,
}

/// A turn as seen from inside its own session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    #[serde(rename = "user")]
    pub user_text: String,
    #[serde(rename = "bot")]
    pub bot_text: String,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Vec<ConversationEntry>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success", message: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error", message: Some(message.into()) }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

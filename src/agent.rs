use crate::error::RelayError;
use crate::history::{ call_blocking, ConversationStore };
use crate::llm::{ ChatClient, Completion };
use crate::models::chat::ConversationEntry;

use log::{ info, warn };
use std::sync::Arc;

pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful and respectful general-purpose AI assistant. \
Your goal is to provide accurate and relevant information on a wide range of topics. \
Please be friendly and conversational in your responses. \
When appropriate, use Markdown for clear formatting, such as bolding for headings and bullet points or numbered lists for key information.";

pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't generate a response for that. \
Your query might have triggered safety filters, or it's outside my current capabilities. \
Please try rephrasing your question.";

pub const MISSING_SESSION_REPLY: &str =
    "Session ID not found in request. Please refresh the page or start a new chat.";

pub const EMPTY_MESSAGE_REPLY: &str = "Message must not be empty.";

/// Renders the full prompt: persona, prior turns oldest first, then the new query.
pub fn build_prompt(history: &[ConversationEntry], message: &str) -> String {
    let mut prompt = String::from(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\n--- Conversation History ---\n");
    for turn in history {
        prompt.push_str(&format!("User: {}\nBot: {}\n", turn.user_text, turn.bot_text));
    }
    prompt.push_str(&format!("--- New User Query ---\nUser: {}\nBot:", message));
    prompt
}

fn log_safety_diagnostics(completion: &Completion) {
    if let Some(feedback) = &completion.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            warn!("Gemini prompt blocked: {}", reason);
        }
        if !feedback.safety_ratings.is_empty() {
            warn!("Gemini Safety Block (Prompt Feedback): {:?}", feedback.safety_ratings);
        }
    }
    if let Some(candidate) = completion.candidates.first() {
        match candidate.finish_reason.as_deref() {
            Some("SAFETY") => {
                warn!("Gemini Safety Block (Candidate Finish Reason): {:?}", candidate.safety_ratings);
            }
            Some(other) => warn!("Gemini Finish Reason (other): {}", other),
            None => {}
        }
    }
}

/// The reply to show for a completion, falling back when nothing usable came back.
pub fn extract_reply(completion: &Completion) -> String {
    match completion.reply_text() {
        Some(text) => text,
        None => {
            log_safety_diagnostics(completion);
            FALLBACK_REPLY.to_string()
        }
    }
}

pub fn validate_request(
    session_id: Option<&str>,
    message: Option<&str>
) -> Result<(String, String), RelayError> {
    let session_id = session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RelayError::Validation(MISSING_SESSION_REPLY.to_string()))?;
    let message = message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| RelayError::Validation(EMPTY_MESSAGE_REPLY.to_string()))?;
    Ok((session_id.to_string(), message.to_string()))
}

#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    store: Arc<ConversationStore>,
}

impl ChatAgent {
    pub fn new(chat_client: Arc<dyn ChatClient>, store: Arc<ConversationStore>) -> Self {
        info!("Chat agent configured: Model={}", chat_client.model());
        Self { chat_client, store }
    }

    pub fn store(&self) -> Arc<ConversationStore> {
        Arc::clone(&self.store)
    }

    /// Reads the session, asks the completion service, stores the new turn
    /// and returns the reply. Nothing is stored when any step fails.
    pub async fn process_message(
        &self,
        session_id: &str,
        message: &str
    ) -> Result<String, RelayError> {
        let history = {
            let session_id = session_id.to_string();
            call_blocking(self.store(), move |store| store.turns_for_session(&session_id)).await?
        };
        let prompt = build_prompt(&history, message);

        let completion = self.chat_client.generate(&prompt).await?;
        let reply = extract_reply(&completion);

        {
            let session_id = session_id.to_string();
            let message = message.to_string();
            let reply = reply.clone();
            call_blocking(self.store(), move |store| store.append(&session_id, &message, &reply)).await?;
        }

        Ok(reply)
    }
}

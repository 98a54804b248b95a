pub mod gemini;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use crate::error::RelayError;

pub use self::gemini::GeminiChatClient;

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 700;

/// Content categories held back at `BLOCK_MEDIUM_AND_ABOVE` on every call.
pub const BLOCKED_HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
pub const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub probability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

/// What the completion service returned for one prompt.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl Completion {
    /// Text of the first part of the first candidate, trimmed.
    /// `None` when there is no candidate, no part, or only whitespace.
    pub fn reply_text(&self) -> Option<String> {
        let text = self.candidates
            .first()?
            .content.as_ref()?
            .parts.first()?
            .text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first().and_then(|c| c.finish_reason.as_deref())
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Completion, RelayError>;

    fn model(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(body: &str) -> Completion {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn reply_text_is_trimmed() {
        let c = completion(r#"{"candidates":[{"content":{"parts":[{"text":"  Hello there \n"}],"role":"model"},"finishReason":"STOP"}]}"#);
        assert_eq!(c.reply_text().as_deref(), Some("Hello there"));
        assert_eq!(c.finish_reason(), Some("STOP"));
    }

    #[test]
    fn only_first_part_is_used() {
        let c = completion(r#"{"candidates":[{"content":{"parts":[{"text":"one"},{"text":"two"}]}}]}"#);
        assert_eq!(c.reply_text().as_deref(), Some("one"));
    }

    #[test]
    fn blocked_prompt_has_no_reply() {
        let c = completion(r#"{"promptFeedback":{"blockReason":"SAFETY","safetyRatings":[{"category":"HARM_CATEGORY_HARASSMENT","probability":"HIGH"}]}}"#);
        assert!(c.reply_text().is_none());
        let feedback = c.prompt_feedback.unwrap();
        assert_eq!(feedback.block_reason.as_deref(), Some("SAFETY"));
        assert_eq!(feedback.safety_ratings[0].probability, "HIGH");
    }

    #[test]
    fn candidate_without_content_has_no_reply() {
        let c = completion(r#"{"candidates":[{"finishReason":"SAFETY","safetyRatings":[{"category":"HARM_CATEGORY_HATE_SPEECH","probability":"MEDIUM","blocked":true}]}]}"#);
        assert!(c.reply_text().is_none());
        assert_eq!(c.finish_reason(), Some("SAFETY"));
    }

    #[test]
    fn whitespace_only_reply_counts_as_empty() {
        let c = completion(r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#);
        assert!(c.reply_text().is_none());
        assert!(Completion::default().reply_text().is_none());
    }
}

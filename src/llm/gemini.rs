use async_trait::async_trait;
use log::{ debug, info };
use serde::{ Deserialize, Serialize };

use super::{
    ChatClient,
    Completion,
    Content,
    Part,
    BLOCKED_HARM_CATEGORIES,
    MAX_OUTPUT_TOKENS,
    SAFETY_THRESHOLD,
    TEMPERATURE,
};
use crate::config::GeminiConfig;
use crate::error::RelayError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == "generateContent")
    }
}

fn build_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt.to_string() }],
            role: Some("user".to_string()),
        }],
        safety_settings: BLOCKED_HARM_CATEGORIES
            .iter()
            .map(|&category| SafetySetting { category, threshold: SAFETY_THRESHOLD })
            .collect(),
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(
    status: reqwest::StatusCode,
    body: &str
) -> Result<T, RelayError> {
    if !status.is_success() {
        return Err(RelayError::Service(format!("HTTP {}: {}", status.as_u16(), body.trim())));
    }
    serde_json::from_str(body)
        .map_err(|e| RelayError::Service(format!("malformed response: {}", e)))
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response
) -> Result<T, RelayError> {
    let status = resp.status();
    let body = resp.text().await?;
    parse_body(status, &body)
}

pub struct GeminiChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(config.api_key.clone(), config.model.clone(), config.base_url.clone())
    }

    fn generate_url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    /// Every model visible to the API key that can serve `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, RelayError> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.client.get(&url).query(&[("key", self.api_key.as_str())]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }
            let page: ListModelsResponse = read_json(req.send().await?).await?;
            models.extend(page.models.into_iter().filter(ModelInfo::supports_generate_content));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(&self, prompt: &str) -> Result<Completion, RelayError> {
        info!("GeminiChatClient::generate() → model={} base_url={}", self.model, self.base_url);
        debug!("Prompt length: {} chars", prompt.len());

        let resp = self.client
            .post(self.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(prompt))
            .send().await?;

        read_json(resp).await
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}

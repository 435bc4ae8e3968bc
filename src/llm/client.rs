use crate::error::{ReconciliationError, Result};
use crate::llm::types::*;
use reqwest::Client;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Reads the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            ReconciliationError::InvalidConfig("GEMINI_API_KEY is not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) async fn generate_content(
        &self,
        model: &str,
        system_prompt: &str,
        messages: Vec<Content>,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: messages,
            system_instruction: Some(Content::user(system_prompt)),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema,
                temperature: 0.0,
            },
        };

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(ReconciliationError::ExtractionFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;

        let part = body
            .candidates
            .ok_or_else(|| {
                ReconciliationError::ExtractionFailed("No candidates returned".to_string())
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReconciliationError::ExtractionFailed("Empty candidates list".to_string())
            })?
            .content
            .parts
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReconciliationError::ExtractionFailed("No parts in content".to_string())
            })?;

        match part {
            Part::Text { text } => Ok(text),
            _ => Err(ReconciliationError::ExtractionFailed(
                "Model returned non-text content".to_string(),
            )),
        }
    }
}

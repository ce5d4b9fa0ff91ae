use crate::config::PlannerConfig;
use crate::error::{EventPlanError, Result};
use crate::llm::types::*;
use futures::future::{BoxFuture, FutureExt};
use log::debug;
use reqwest::Client;

/// Anything that turns a prompt into free-form text.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, request: &'a LlmRequest) -> BoxFuture<'a, Result<String>>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::from_config(&PlannerConfig::new(api_key, String::new()))
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.llm_api_key.clone(),
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_content(
        &self,
        prompt: &str,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response_mime_type = response_schema
            .as_ref()
            .map(|_| "application/json".to_string());

        let payload = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type,
                response_schema,
            },
        };

        debug!("Sending {} character prompt to {}", prompt.len(), self.model);

        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(EventPlanError::Llm(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;

        let candidate = body
            .candidates
            .ok_or_else(|| EventPlanError::Llm("No candidates returned".to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EventPlanError::Llm("Empty candidates list".to_string()))?;

        let text = candidate
            .content
            .map(|c| c.text())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(EventPlanError::Llm(format!(
                "Model returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

impl TextGenerator for GeminiClient {
    fn generate<'a>(&'a self, request: &'a LlmRequest) -> BoxFuture<'a, Result<String>> {
        self.generate_content(&request.prompt, request.response_schema.clone())
            .boxed()
    }
}

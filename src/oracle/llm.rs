//! LLM-backed relevance oracle.
//!
//! The profile tags go into the instruction, the candidate universe is sent as
//! a JSON array, and the model is asked to answer with the same array sorted
//! by relevance.

use super::RelevanceOracle;
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    Gemini,
    OpenAi,
    Anthropic,
    /// Local, deterministic ordering for development; no network.
    Mock,
}

impl OracleBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleBackend::Gemini => "gemini",
            OracleBackend::OpenAi => "openai",
            OracleBackend::Anthropic => "anthropic",
            OracleBackend::Mock => "mock",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            OracleBackend::Gemini => "gemini-1.5-flash-latest",
            OracleBackend::OpenAi => "gpt-4o-mini",
            OracleBackend::Anthropic => "claude-3-haiku-20240307",
            OracleBackend::Mock => "mock",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            OracleBackend::Gemini => "https://generativelanguage.googleapis.com",
            OracleBackend::OpenAi => "https://api.openai.com",
            OracleBackend::Anthropic => "https://api.anthropic.com",
            OracleBackend::Mock => "",
        }
    }
}

const GEMINI_SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct LlmRelevanceOracle {
    backend: OracleBackend,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    http: reqwest::Client,
}

impl LlmRelevanceOracle {
    pub fn new(
        backend: OracleBackend,
        api_key: Option<String>,
        model: String,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build oracle HTTP client")?;
        Ok(Self {
            backend,
            api_key,
            model,
            base_url: backend.default_base_url().to_string(),
            temperature,
            max_tokens,
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut oracle = Self::new(
            config.oracle_backend,
            config.oracle_api_key.clone(),
            config.oracle_model.clone(),
            config.oracle_temperature,
            config.oracle_max_tokens,
            Duration::from_millis(config.oracle_timeout_ms),
        )?;
        if let Some(url) = &config.oracle_base_url {
            oracle.base_url = url.trim_end_matches('/').to_string();
        }
        Ok(oracle)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn instruction(profile_tags: &[String]) -> Result<String> {
        let profile = serde_json::to_string(profile_tags)?;
        Ok(format!(
            "You will be provided with a JSON array of tags, and your task is to sort the JSON Array \
             according to the relevance of the tag in this JSON array: {profile}"
        ))
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{} API key not set", self.backend.as_str()))
    }

    async fn rank_gemini(&self, instruction: &str, payload: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let safety: Vec<_> = GEMINI_SAFETY_CATEGORIES
            .iter()
            .map(|c| serde_json::json!({ "category": c, "threshold": "BLOCK_MEDIUM_AND_ABOVE" }))
            .collect();

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&serde_json::json!({
                "systemInstruction": { "parts": [{ "text": instruction }] },
                "contents": [{ "role": "user", "parts": [{ "text": payload }] }],
                "generationConfig": {
                    "temperature": self.temperature,
                    "topP": 0.95,
                    "topK": 64,
                    "maxOutputTokens": self.max_tokens,
                    "responseMimeType": "application/json",
                },
                "safetySettings": safety,
            }))
            .send()
            .await
            .context("Gemini API request failed")?;

        let body: GeminiResponse = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let text: String = body
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .ok_or_else(|| anyhow!("Gemini response contained no candidates"))?;
        Ok(text)
    }

    async fn rank_openai(&self, instruction: &str, payload: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": instruction },
                    { "role": "user", "content": payload },
                ],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            }))
            .send()
            .await
            .context("OpenAI API request failed")?;

        let body: OpenAIResponse = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let text = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| anyhow!("OpenAI response contained no choices"))?;
        Ok(extract_json_from_markdown(&text))
    }

    async fn rank_anthropic(&self, instruction: &str, payload: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&serde_json::json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "system": instruction,
                "messages": [{ "role": "user", "content": payload }],
            }))
            .send()
            .await
            .context("Anthropic API request failed")?;

        let body: AnthropicResponse = check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let text = body
            .content
            .first()
            .map(|c| c.text.trim().to_string())
            .ok_or_else(|| anyhow!("Anthropic response contained no content"))?;
        Ok(extract_json_from_markdown(&text))
    }

    /// Candidates that appear in the profile first (profile order), then the
    /// rest in input order.
    fn rank_mock(&self, profile_tags: &[String], candidates: &[String]) -> Result<String> {
        let profile: Vec<String> = profile_tags.iter().map(|t| t.to_lowercase()).collect();
        let mut ordered: Vec<&String> = Vec::with_capacity(candidates.len());
        for p in &profile {
            if let Some(c) = candidates.iter().find(|c| *c == p) {
                if !ordered.contains(&c) {
                    ordered.push(c);
                }
            }
        }
        for c in candidates {
            if !ordered.contains(&c) {
                ordered.push(c);
            }
        }
        Ok(serde_json::to_string(&ordered)?)
    }
}

#[async_trait]
impl RelevanceOracle for LlmRelevanceOracle {
    async fn rank(&self, profile_tags: &[String], candidates: &[String]) -> Result<String> {
        let instruction = Self::instruction(profile_tags)?;
        let payload = serde_json::to_string(candidates)?;

        match self.backend {
            OracleBackend::Gemini => self.rank_gemini(&instruction, &payload).await,
            OracleBackend::OpenAi => self.rank_openai(&instruction, &payload).await,
            OracleBackend::Anthropic => self.rank_anthropic(&instruction, &payload).await,
            OracleBackend::Mock => self.rank_mock(profile_tags, candidates),
        }
    }

    fn name(&self) -> &str {
        self.backend.as_str()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(anyhow!("Oracle API error: {} - {}", status, body))
}

/// Chat models sometimes wrap JSON answers in a fenced code block.
fn extract_json_from_markdown(text: &str) -> String {
    if let Some(start) = text.find("```") {
        let after_start = &text[start + 3..];
        if let Some(lang_end) = after_start.find('\n') {
            let inner = &after_start[lang_end + 1..];
            if let Some(end) = inner.find("```") {
                return inner[..end].trim().to_string();
            }
        }
    }
    text.to_string()
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::config::Config;
use crate::error::{DeclutterError, Result};

/// A text-in, text-out generative model. One blocking call per prompt, no retries.
pub trait CompletionProvider {
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable name for status output.
    fn name(&self) -> &str;
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client from configuration. Fails fast when no API key is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let mut builder = reqwest::blocking::Client::builder();
        builder = match config.request_timeout_secs {
            Some(secs) => builder.timeout(Duration::from_secs(secs)),
            None => builder.timeout(None),
        };
        let client = builder.build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

impl CompletionProvider for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content { parts: vec![RequestPart { text: prompt }] }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling generateContent");

        let response = self.client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%status, "generateContent failed");
            return Err(DeclutterError::Service(format!("{} returned {}: {}", self.model, status, body)));
        }

        let body: GenerateResponse = response.json()?;
        extract_text(body)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn extract_text(body: GenerateResponse) -> Result<String> {
    let text: String = body.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(DeclutterError::Service("reply contained no text".to_string()));
    }
    Ok(text)
}

//! Summarizer API client module
//!
//! Encapsulates the Gemini `generateContent` call used to summarize a feed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::prompt_builder::SummaryRequest;
use crate::core::config::AppConfig;
use crate::errors::HuddleError;

/// External text-generation endpoint.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// # Errors
    ///
    /// `MalformedResponse` when the reply lacks generated text; `Summarizer`
    /// or `HttpError` when the call itself fails.
    async fn generate(&self, request: &SummaryRequest) -> Result<String, HuddleError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    system_instruction: RequestContent<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> RequestContent<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            parts: vec![RequestPart { text }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Build the JSON body for a `generateContent` call.
///
/// # Errors
///
/// Returns `MalformedResponse` if the body cannot be serialized.
pub fn build_request_body(request: &SummaryRequest) -> Result<serde_json::Value, HuddleError> {
    let body = GenerateContentRequest {
        contents: vec![RequestContent::text(&request.user_prompt)],
        system_instruction: RequestContent::text(&request.system_instruction),
    };
    Ok(serde_json::to_value(body)?)
}

/// Extract `candidates[0].content.parts[0].text` from a response body.
///
/// # Errors
///
/// Returns `MalformedResponse` for any other shape, including empty text.
pub fn parse_generated_text(body: &str) -> Result<String, HuddleError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;

    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            HuddleError::MalformedResponse(
                "missing candidates[0].content.parts[0].text".to_string(),
            )
        })
}

/// Gemini API client for generating summaries
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns `HttpError` if the HTTP client cannot be built.
    pub fn new(
        api_key: String,
        model_name: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, HuddleError> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            HuddleError::HttpError(format!("Failed to build summarizer HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            api_key,
            model_name,
            base_url,
        })
    }

    /// # Errors
    ///
    /// Returns `HttpError` if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, HuddleError> {
        Self::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            config.http_timeout,
        )
    }

    fn endpoint(&self) -> Result<Url, HuddleError> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model_name
        );
        Ok(Url::parse_with_params(&raw, &[("key", self.api_key.as_str())])?)
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn generate(&self, request: &SummaryRequest) -> Result<String, HuddleError> {
        #[cfg(feature = "debug-logs")]
        info!("Using summarizer prompt:\n{}", request.user_prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            "Generating summary with model {} ({} prompt chars)",
            self.model_name,
            request.user_prompt.chars().count()
        );

        let response = self
            .http
            .post(self.endpoint()?)
            .json(&build_request_body(request)?)
            .send()
            .await
            .map_err(|e| HuddleError::HttpError(format!("Summarizer request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            HuddleError::HttpError(format!("Failed to read summarizer response: {e}"))
        })?;

        if !status.is_success() {
            return Err(HuddleError::Summarizer(format!("status {status}: {body}")));
        }

        debug!("Summarizer responded with {} bytes", body.len());
        parse_generated_text(&body)
    }
}

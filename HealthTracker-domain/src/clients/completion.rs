//! Summaries of recent measurements from an LLM chat completion API.
//!
//! The client never fails its caller: a missing API key, transport errors
//! that survive the retry budget, error statuses and responses without a
//! usable `choices[0].message.content` all produce [`FALLBACK_SUMMARY`].

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use health_tracker_data::models::HealthData;

use crate::config::SummarizationConfig;

/// Returned whenever no summary could be obtained
pub const FALLBACK_SUMMARY: &str = "No response.";

const PROMPT_PREFIX: &str = "You are a health assistant. Summarize the following health measurements \
from the last days in two or three short sentences for the person who recorded them. \
Point out notable trends or values outside the usual range. Do not give medical diagnoses.";

/// Errors talking to the completion API
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion API key is not configured")]
    NotConfigured,

    #[error("Completion request timed out")]
    Timeout,

    #[error("Completion API unreachable: {0}")]
    Transport(reqwest::Error),

    #[error("Completion API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Timeout => true,
            CompletionError::Transport(err) => err.is_connect() || err.is_timeout(),
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            CompletionError::NotConfigured | CompletionError::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout
        } else if err.is_decode() {
            CompletionError::InvalidResponse(err.to_string())
        } else {
            CompletionError::Transport(err)
        }
    }
}

/// Produces a short text summary of windowed measurements
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize measurements grouped by device type label
    async fn summarize(&self, data: &IndexMap<String, Vec<HealthData>>) -> String;

    /// Whether the summarizer can reach a real backend
    fn is_configured(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    }
}

/// Render the instruction prefix and one line per measurement, grouped by device type
pub fn build_prompt(data: &IndexMap<String, Vec<HealthData>>) -> String {
    let mut prompt = String::from(PROMPT_PREFIX);

    for (device_type, records) in data {
        let _ = write!(prompt, "\n\n{} ({} measurements):", device_type, records.len());
        if records.is_empty() {
            prompt.push_str("\n- no data");
        }
        for record in records {
            let _ = write!(
                prompt,
                "\n- {} {}: {}",
                record.measured_at.format("%Y-%m-%d %H:%M"),
                record.data_type,
                record.value_numeric
            );
            if let Some(unit) = &record.unit {
                let _ = write!(prompt, " {}", unit);
            }
            if let Some(text) = &record.value_text {
                let _ = write!(prompt, " ({})", text);
            }
        }
    }

    prompt
}

/// HTTP client for an OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    config: SummarizationConfig,
}

impl CompletionClient {
    /// Create a client whose requests are bounded by the configured timeout
    pub fn new(config: SummarizationConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(CompletionError::Transport)?;
        Ok(Self { http, config })
    }

    /// Send one prompt, retrying transient failures with exponential backoff.
    ///
    /// `Ok(None)` means the API answered without usable content.
    pub async fn complete(&self, prompt: &str) -> Result<Option<String>, CompletionError> {
        let mut delay = Duration::from_millis(self.config.retry_backoff_ms);
        let mut attempt: u32 = 0;

        loop {
            match self.request_once(prompt).await {
                Ok(content) => return Ok(content),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "Completion attempt {} failed ({}), retrying in {:?}",
                        attempt, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_once(&self, prompt: &str) -> Result<Option<String>, CompletionError> {
        let api_key = self.config.api_key.as_deref().ok_or(CompletionError::NotConfigured)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
        };

        debug!("Requesting completion from {}", self.config.api_url);
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        Ok(parsed.first_content())
    }
}

#[async_trait]
impl Summarizer for CompletionClient {
    async fn summarize(&self, data: &IndexMap<String, Vec<HealthData>>) -> String {
        if !self.is_configured() {
            warn!("No completion API key configured; returning fallback summary");
            return FALLBACK_SUMMARY.to_string();
        }

        let prompt = build_prompt(data);
        match self.complete(&prompt).await {
            Ok(Some(summary)) => {
                info!("Received summary of {} characters", summary.len());
                summary
            }
            Ok(None) => {
                warn!("Completion response carried no content; returning fallback summary");
                FALLBACK_SUMMARY.to_string()
            }
            Err(err) => {
                error!("Completion API unavailable: {}", err);
                FALLBACK_SUMMARY.to_string()
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

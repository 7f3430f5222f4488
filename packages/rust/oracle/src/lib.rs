//! Recommendation oracle backed by an Ollama-compatible `/api/generate`.
//!
//! The model is asked for JSON. Whatever it returns is cut down to the span
//! between the first `{` and the last `}` before parsing; if that still fails,
//! a fixed fallback recommendation or script is returned instead.

mod prompts;

use std::time::Duration;

use channelscope_analysis::AnalysisResult;
use channelscope_shared::{ChannelScopeError, OllamaConfig, Recommendation, Result, Script};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub use prompts::summarize_analysis;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    format: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

// ---------------------------------------------------------------------------
// OllamaOracle
// ---------------------------------------------------------------------------

/// Client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaOracle {
    http: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaOracle {
    /// Build an oracle from the `[ollama]` config section.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelScopeError::Oracle(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/generate", normalize_host(&config.host)),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// One non-streaming completion; returns the model's raw text.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            format: "json",
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChannelScopeError::Oracle(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelScopeError::Oracle(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ChannelScopeError::Oracle(format!("invalid response body: {e}")))?;
        debug!(len = body.response.len(), "model responded");
        Ok(body.response)
    }

    /// Ask for ranked recommendations for an analysis.
    ///
    /// Always returns at least one recommendation when the server answers.
    #[instrument(skip_all, fields(model = %self.model, analysis_id = %analysis.analysis_id))]
    pub async fn recommend(&self, analysis: &AnalysisResult) -> Result<Vec<Recommendation>> {
        let prompt = prompts::recommendation_prompt(analysis);
        let text = self.generate(prompts::RECOMMEND_SYSTEM, &prompt).await?;

        let recommendations = parse_recommendations(&text);
        if recommendations.is_empty() {
            warn!("could not parse recommendations from model output, using fallback");
            return Ok(vec![prompts::fallback_recommendation()]);
        }
        Ok(recommendations)
    }

    /// Ask for a production script for one recommendation.
    #[instrument(skip_all, fields(model = %self.model, topic = %recommendation.recommended_topic))]
    pub async fn script(&self, recommendation: &Recommendation) -> Result<Script> {
        let prompt = prompts::script_prompt(recommendation);
        let text = self.generate(prompts::SCRIPT_SYSTEM, &prompt).await?;

        match extract_json(&text).and_then(|json| serde_json::from_str::<Script>(json).ok()) {
            Some(script) => Ok(script),
            None => {
                warn!("could not parse script from model output, using fallback");
                Ok(prompts::fallback_script(recommendation))
            }
        }
    }
}

/// Prepend `http://` when the host has no scheme; drop a trailing slash.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// The span from the first `{` to the last `}`, if any.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Entries of the `recommendations` array that decode; others are skipped.
fn parse_recommendations(text: &str) -> Vec<Recommendation> {
    let Some(json) = extract_json(text) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json) else {
        return Vec::new();
    };
    let Some(entries) = value.get("recommendations").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(error = %e, "skipping malformed recommendation");
                None
            }
        })
        .collect()
}

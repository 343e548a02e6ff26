//! Remote location-parsing model client.
//!
//! The production implementation talks to OpenRouter's chat-completions API.
//! The [`LocationModel`] trait is the seam the rest of the engine depends
//! on, so tests can substitute a scripted model.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::EnrichError;
use crate::model::StructuredLocation;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: usize = 3;

/// Default model when the run config leaves it unset.
pub const DEFAULT_ENRICHMENT_MODEL: &str = "google/gemini-2.5-flash";

const LOCATION_SYSTEM_PROMPT: &str = "You are a location parsing expert. Parse location strings into structured data with city, country, and region fields. Always respond with valid JSON and nothing else.\n\nRules:\n- Extract city, country, and region\n- Use \"Remote\" for region if the location indicates remote work\n- Use full country names (e.g., \"United States\", not \"US\")\n- If uncertain, use \"Unknown\" for that field\n- Region values are continents: Americas, Europe, Asia, Africa, Oceania; extrapolate from the country\n- Confidence score: 0.1-1.0 based on clarity of the input\n\nWhen given a list of locations, respond with a single JSON object whose keys are the input strings exactly as written and whose values are objects of the form {\"city\": string, \"country\": string, \"region\": string, \"confidence\": number}.\n\nWhen given a single location, respond with one such object.";

/// Remote model that turns free-text locations into structured ones.
#[async_trait]
pub trait LocationModel: Send + Sync {
    /// Parse the full unique list in one call. The result is keyed by the
    /// input strings; inputs the model failed to cover are simply absent.
    async fn parse_batch(
        &self,
        locations: &[String],
    ) -> Result<HashMap<String, StructuredLocation>, EnrichError>;

    /// Parse one location.
    async fn parse_single(&self, location: &str) -> Result<StructuredLocation, EnrichError>;
}

/// OpenRouter-backed [`LocationModel`].
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: if model.is_empty() {
                DEFAULT_ENRICHMENT_MODEL.to_string()
            } else {
                model
            },
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn chat(&self, user_prompt: &str) -> Result<String, EnrichError> {
        let mut backoff = Duration::from_secs(1);
        let mut last_error = EnrichError::Api("no attempts made".to_string());

        for attempt in 1..=MAX_ATTEMPTS {
            match self.chat_once(user_prompt).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    warn!(attempt, error = %e, "enrichment request failed");
                    last_error = e;
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn chat_once(&self, user_prompt: &str) -> Result<String, EnrichError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": LOCATION_SYSTEM_PROMPT },
                    { "role": "user", "content": user_prompt },
                ],
            }))
            .send()
            .await
            .map_err(|e| EnrichError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Api(format!("{status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Malformed(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(EnrichError::Malformed("empty completion".to_string()));
        }
        Ok(content)
    }
}

#[async_trait]
impl LocationModel for OpenRouterClient {
    async fn parse_batch(
        &self,
        locations: &[String],
    ) -> Result<HashMap<String, StructuredLocation>, EnrichError> {
        if locations.is_empty() {
            return Ok(HashMap::new());
        }

        let listing = serde_json::to_string_pretty(locations)
            .map_err(|e| EnrichError::Malformed(e.to_string()))?;
        let prompt = format!(
            "Parse these locations. Respond with one JSON object keyed by each input string exactly as written:\n{listing}"
        );

        let content = self.chat(&prompt).await?;
        let cleaned = strip_code_fences(&content);
        let parsed: HashMap<String, StructuredLocation> =
            serde_json::from_str(cleaned).map_err(|e| EnrichError::Malformed(e.to_string()))?;

        let missing = locations.iter().filter(|l| !parsed.contains_key(*l)).count();
        if missing > 0 {
            warn!(missing, "batch response did not cover every location");
        }
        debug!(parsed = parsed.len(), "batch location parse complete");
        Ok(parsed)
    }

    async fn parse_single(&self, location: &str) -> Result<StructuredLocation, EnrichError> {
        let prompt = format!("Parse this location: {location}");
        let content = self.chat(&prompt).await?;
        let cleaned = strip_code_fences(&content);
        serde_json::from_str(cleaned).map_err(|e| EnrichError::Malformed(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Strip a markdown code fence if the model wrapped its JSON in one.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let inner = &trimmed[start + fence.len()..];
            if let Some(end) = inner.find("```") {
                return inner[..end].trim();
            }
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let text = "```json\n{\"city\": \"London\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"city\": \"London\"}");
    }

    #[test]
    fn strips_bare_fence() {
        let text = "```\n{}\n```";
        assert_eq!(strip_code_fences(text), "{}");
    }

    #[test]
    fn leaves_plain_json_alone() {
        let text = "  {\"city\": null}  ";
        assert_eq!(strip_code_fences(text), "{\"city\": null}");
    }
}

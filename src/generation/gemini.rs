//! Gemini `generateContent` client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{Completion, GenerationError, GenerationRequest, GenerationService, RequestPart};
use crate::config::{Config, GenerationConfig, SafetySetting};
use crate::profile::DomainProfile;

/// Finish reasons that mean the candidate was withheld rather than empty.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    generation: GenerationConfig,
    safety: Vec<SafetySetting>,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: String,
        generation: GenerationConfig,
        safety: Vec<SafetySetting>,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            generation,
            safety,
            timeout_secs,
        })
    }

    /// Client for the configured endpoint and the profile's model.
    pub fn from_config(config: &Config, profile: &DomainProfile) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        let client = Self::new(
            api_key,
            &config.gemini.base_url,
            config.model_for(profile),
            config.generation.clone(),
            config.safety.clone(),
            config.gemini.timeout_seconds,
        )?;
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let parts = request
            .parts()
            .iter()
            .map(|part| match part {
                RequestPart::Text(text) => Part::Text { text: text.clone() },
                RequestPart::Image { mime_type, data } => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.clone(),
                        data: STANDARD.encode(data),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: WireGenerationConfig {
                temperature: self.generation.temperature,
                top_p: self.generation.top_p,
                top_k: (self.generation.top_k > 0).then_some(self.generation.top_k),
                max_output_tokens: self.generation.max_output_tokens,
            },
            safety_settings: self.safety.clone(),
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Completion, GenerationError> {
        let body = self.build_body(request);
        let started = Instant::now();

        debug!(
            "Calling {} with {} part(s), {} image(s)",
            self.model,
            request.parts().len(),
            request.image_count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::ApiRequestFailed(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;

        debug!(
            "{} responded {} in {}ms",
            self.model,
            status.as_u16(),
            started.elapsed().as_millis()
        );

        if !status.is_success() {
            let message = provider_error_message(&text);
            warn!("Gemini API error {}: {}", status, message);
            return Err(if status.as_u16() == 429 {
                GenerationError::RateLimited(message)
            } else {
                GenerationError::Provider {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        Ok(classify(parsed))
    }
}

/// Map a successful response body onto the four outcome kinds.
fn classify(response: GenerateContentResponse) -> Completion {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Completion::Blocked { reason };
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Completion::Absent;
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Completion::Text(text);
    }

    match candidate.finish_reason {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
            Completion::Blocked { reason }
        }
        _ => Completion::Empty,
    }
}

fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.chars().take(500).collect())
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_safety_settings;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "test-key".to_string(),
            "https://example.invalid/v1beta/",
            "gemini-2.0-flash".to_string(),
            GenerationConfig::default(),
            default_safety_settings(),
            30,
        )
        .unwrap()
    }

    fn parse(value: serde_json::Value) -> Completion {
        classify(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            client().endpoint(),
            "https://example.invalid/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = GeminiClient::new(
            "  ".to_string(),
            "https://example.invalid",
            "m".to_string(),
            GenerationConfig::default(),
            Vec::new(),
            30,
        );
        assert!(matches!(result, Err(GenerationError::Config(_))));
    }

    #[test]
    fn test_image_body_layout() {
        let request = GenerationRequest::with_image("image/png", b"PNG".to_vec(), "Analyze");
        let body = serde_json::to_value(client().build_body(&request)).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], STANDARD.encode(b"PNG"));
        assert_eq!(parts[1]["text"], "Analyze");
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[test]
    fn test_generation_config_omits_disabled_top_k() {
        let body = serde_json::to_value(client().build_body(&GenerationRequest::text("hi"))).unwrap();
        let config = &body["generationConfig"];

        assert_eq!(config["temperature"], 1.0);
        assert_eq!(config["maxOutputTokens"], 8192);
        assert!(config.get("topK").is_none());
        assert!((config["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_safety_settings_wire_names() {
        let body = serde_json::to_value(client().build_body(&GenerationRequest::text("hi"))).unwrap();
        let settings = body["safetySettings"].as_array().unwrap();

        assert_eq!(settings.len(), 4);
        assert_eq!(settings[0]["category"], "HARM_CATEGORY_HARASSMENT");
        assert!(settings
            .iter()
            .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
    }

    #[test]
    fn test_classify_text_is_verbatim() {
        let completion = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "  Looks "}, {"text": "fine.\n"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(completion, Completion::Text("  Looks fine.\n".to_string()));
    }

    #[test]
    fn test_classify_distinguishes_empty_absent_blocked() {
        assert_eq!(parse(json!({"candidates": []})), Completion::Absent);
        assert_eq!(parse(json!({})), Completion::Absent);

        assert_eq!(
            parse(json!({
                "candidates": [{"content": {"parts": [{"text": ""}]}, "finishReason": "STOP"}]
            })),
            Completion::Empty
        );

        assert_eq!(
            parse(json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })),
            Completion::Blocked {
                reason: "SAFETY".to_string()
            }
        );

        assert_eq!(
            parse(json!({
                "promptFeedback": {"blockReason": "OTHER"}
            })),
            Completion::Blocked {
                reason: "OTHER".to_string()
            }
        );
    }

    #[test]
    fn test_provider_error_message_extraction() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(provider_error_message(body), "API key not valid.");
        assert_eq!(provider_error_message("gateway down"), "gateway down");
    }
}

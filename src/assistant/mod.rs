//! The assistant front-end: image analysis, chat, and transcript rendering.
//!
//! Every user action issues exactly one generation request. Chat failures never
//! reach the caller; they turn into a fallback transcript entry instead.

mod render;
mod transcript;

pub use render::{escape_html, render_markdown, render_transcript, render_transcript_text};
pub use transcript::{Exchange, Transcript};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::generation::{Completion, GenerationError, GenerationRequest, GenerationService};
use crate::profile::{DomainProfile, ANALYSIS_HEADING};

/// Bot text recorded when a chat exchange produced no usable answer.
pub const CHAT_FALLBACK_MESSAGE: &str = "Sorry, I couldn't process your query. Please try again.";

/// Mime types accepted for analysis, after normalization.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("No image data was uploaded")]
    EmptyImage,

    #[error("Unsupported image type '{0}'. Upload a PNG or JPEG image")]
    UnsupportedMimeType(String),

    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("The model returned no analysis for this image. Please try again")]
    NoContent,

    #[error("The request was blocked by the content-safety filter ({reason})")]
    Blocked { reason: String },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Image bytes plus the declared mime type, held for one request only.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl UploadedImage {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Read a local file, taking the mime type from its extension.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Self::new(data, mime_type))
    }

    /// Canonical mime type if the image is acceptable for analysis.
    pub fn validated_mime_type(&self) -> Result<&'static str, AssistantError> {
        if self.data.is_empty() {
            return Err(AssistantError::EmptyImage);
        }
        normalize_mime_type(&self.mime_type)
            .ok_or_else(|| AssistantError::UnsupportedMimeType(self.mime_type.clone()))
    }
}

fn normalize_mime_type(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Some("image/png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Model output for one image, displayed under a fixed heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub heading: String,
    pub text: String,
}

#[derive(Clone)]
pub struct Assistant {
    profile: Arc<DomainProfile>,
    service: Arc<dyn GenerationService>,
}

impl Assistant {
    pub fn new(profile: DomainProfile, service: Arc<dyn GenerationService>) -> Self {
        Self {
            profile: Arc::new(profile),
            service,
        }
    }

    pub fn profile(&self) -> &DomainProfile {
        &self.profile
    }

    /// Send one image with the profile's analysis template.
    pub async fn submit_image_analysis(
        &self,
        image: UploadedImage,
    ) -> Result<Analysis, AssistantError> {
        let mime_type = image.validated_mime_type()?;

        info!(
            "Analyzing {} image ({} bytes) with {} profile",
            mime_type,
            image.data.len(),
            self.profile.kind
        );

        let request =
            GenerationRequest::with_image(mime_type, image.data, self.profile.analysis_prompt.clone());

        match self.service.generate(&request).await? {
            Completion::Text(text) => Ok(Analysis {
                heading: ANALYSIS_HEADING.to_string(),
                text,
            }),
            Completion::Blocked { reason } => {
                warn!("Image analysis blocked: {}", reason);
                Err(AssistantError::Blocked { reason })
            }
            Completion::Empty | Completion::Absent => {
                warn!("Image analysis returned no content");
                Err(AssistantError::NoContent)
            }
        }
    }

    /// Ask one chat question and append the exchange to `transcript`.
    ///
    /// Only an empty query is rejected; every other outcome appends exactly one entry.
    pub async fn submit_chat_query<'t>(
        &self,
        transcript: &'t mut Transcript,
        query: &str,
    ) -> Result<&'t Exchange, AssistantError> {
        if query.is_empty() {
            return Err(AssistantError::EmptyQuery);
        }

        let request = GenerationRequest::text(self.profile.chat_prompt_for(query));
        let asked_at = Utc::now();

        let answer = match self.service.generate(&request).await {
            Ok(Completion::Text(text)) => Some(text),
            Ok(other) => {
                warn!("Chat query produced no answer: {:?}", other);
                None
            }
            Err(e) => {
                warn!("Chat query failed: {}", e);
                None
            }
        };

        let exchange = match answer {
            Some(bot) => Exchange {
                user: query.to_string(),
                bot,
                fallback: false,
                asked_at,
            },
            None => Exchange {
                user: query.to_string(),
                bot: CHAT_FALLBACK_MESSAGE.to_string(),
                fallback: true,
                asked_at,
            },
        };

        debug!("Appending exchange #{}", transcript.len() + 1);
        Ok(transcript.append(exchange))
    }

    pub fn render_transcript(&self, transcript: &Transcript) -> String {
        render_transcript(transcript, &self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{MockGenerationService, RequestPart};

    const PNG_10X10: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x0A, 0x08, 0x02, 0x00, 0x00, 0x00, 0x02,
        0x50, 0x58, 0xEA,
    ];

    fn assistant(mock: MockGenerationService) -> Assistant {
        Assistant::new(DomainProfile::medical(), Arc::new(mock))
    }

    #[tokio::test]
    async fn test_image_analysis_sends_one_image_then_template() {
        let template = DomainProfile::medical().analysis_prompt;
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .times(1)
            .withf(move |request: &GenerationRequest| {
                request.parts().len() == 2
                    && request.image_count() == 1
                    && matches!(
                        &request.parts()[0],
                        RequestPart::Image { mime_type, data }
                            if mime_type == "image/png" && data.as_slice() == PNG_10X10
                    )
                    && request.parts()[1] == RequestPart::Text(template.clone())
            })
            .returning(|_| Ok(Completion::Text("No anomalies detected.".to_string())));

        let analysis = assistant(mock)
            .submit_image_analysis(UploadedImage::new(PNG_10X10.to_vec(), "image/png"))
            .await
            .unwrap();

        assert_eq!(analysis.heading, ANALYSIS_HEADING);
        assert_eq!(analysis.text, "No anomalies detected.");
    }

    #[tokio::test]
    async fn test_image_analysis_normalizes_jpg_alias() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .times(1)
            .withf(|request: &GenerationRequest| {
                matches!(
                    &request.parts()[0],
                    RequestPart::Image { mime_type, .. } if mime_type == "image/jpeg"
                )
            })
            .returning(|_| Ok(Completion::Text("ok".to_string())));

        let result = assistant(mock)
            .submit_image_analysis(UploadedImage::new(vec![0xFF, 0xD8, 0xFF], "image/JPG"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_image_preconditions_issue_no_request() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate().never();
        let assistant = assistant(mock);

        let err = assistant
            .submit_image_analysis(UploadedImage::new(Vec::new(), "image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::EmptyImage));

        let err = assistant
            .submit_image_analysis(UploadedImage::new(b"GIF89a".to_vec(), "image/gif"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::UnsupportedMimeType(ref m) if m == "image/gif"));
    }

    #[tokio::test]
    async fn test_image_analysis_surfaces_missing_and_blocked_output() {
        let mut mock = MockGenerationService::new();
        let mut outcomes = vec![
            Completion::Blocked {
                reason: "SAFETY".to_string(),
            },
            Completion::Empty,
            Completion::Absent,
        ];
        mock.expect_generate()
            .times(3)
            .returning(move |_| Ok(outcomes.pop().unwrap()));
        let assistant = assistant(mock);
        let image = || UploadedImage::new(PNG_10X10.to_vec(), "image/png");

        let err = assistant.submit_image_analysis(image()).await.unwrap_err();
        assert!(matches!(err, AssistantError::NoContent));
        let err = assistant.submit_image_analysis(image()).await.unwrap_err();
        assert!(matches!(err, AssistantError::NoContent));
        let err = assistant.submit_image_analysis(image()).await.unwrap_err();
        assert!(matches!(err, AssistantError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn test_image_analysis_propagates_transport_errors() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Err(GenerationError::Timeout(120)));

        let err = assistant(mock)
            .submit_image_analysis(UploadedImage::new(PNG_10X10.to_vec(), "image/png"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Generation(GenerationError::Timeout(120))
        ));
    }

    #[tokio::test]
    async fn test_chat_success_appends_verbatim_query() {
        let query = "  What foods help with iron deficiency?  ";
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .times(1)
            .withf(move |request: &GenerationRequest| {
                request.image_count() == 0
                    && request.parts().len() == 1
                    && request
                        .text_parts()
                        .next()
                        .map(|t| t.ends_with(&format!("User Query: {}\n", query)))
                        .unwrap_or(false)
            })
            .returning(|_| Ok(Completion::Text("Spinach, lentils, red meat.".to_string())));

        let mut transcript = Transcript::new();
        let exchange = assistant(mock)
            .submit_chat_query(&mut transcript, query)
            .await
            .unwrap()
            .clone();

        assert_eq!(exchange.user, query);
        assert_eq!(exchange.bot, "Spinach, lentils, red meat.");
        assert!(!exchange.fallback);
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_appends_fallback() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate().times(1).returning(|_| {
            Err(GenerationError::Provider {
                status: 500,
                message: "internal".to_string(),
            })
        });

        let mut transcript = Transcript::new();
        assistant(mock)
            .submit_chat_query(&mut transcript, "What foods help with iron deficiency?")
            .await
            .unwrap();

        let entry = transcript.last().unwrap();
        assert_eq!(entry.user, "What foods help with iron deficiency?");
        assert_eq!(
            entry.bot,
            "Sorry, I couldn't process your query. Please try again."
        );
        assert!(entry.fallback);
    }

    #[tokio::test]
    async fn test_chat_non_text_outcomes_append_fallback_in_order() {
        let mut mock = MockGenerationService::new();
        let mut outcomes = vec![
            Completion::Text("fine".to_string()),
            Completion::Blocked {
                reason: "SAFETY".to_string(),
            },
            Completion::Absent,
            Completion::Empty,
        ];
        mock.expect_generate()
            .times(4)
            .returning(move |_| Ok(outcomes.remove(0)));
        let assistant = assistant(mock);

        let mut transcript = Transcript::new();
        for q in ["a", "b", "c", "d"] {
            assistant.submit_chat_query(&mut transcript, q).await.unwrap();
        }

        let users: Vec<_> = transcript.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["a", "b", "c", "d"]);
        let bots: Vec<_> = transcript.iter().map(|e| e.bot.as_str()).collect();
        assert_eq!(
            bots,
            vec![
                "fine",
                CHAT_FALLBACK_MESSAGE,
                CHAT_FALLBACK_MESSAGE,
                CHAT_FALLBACK_MESSAGE
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_chat_query_is_rejected_without_request() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate().never();

        let mut transcript = Transcript::new();
        let err = assistant(mock)
            .submit_chat_query(&mut transcript, "")
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::EmptyQuery));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_mime_normalization() {
        assert_eq!(normalize_mime_type("image/png"), Some("image/png"));
        assert_eq!(normalize_mime_type("IMAGE/JPEG; q=1"), Some("image/jpeg"));
        assert_eq!(normalize_mime_type("image/jpg"), Some("image/jpeg"));
        assert_eq!(normalize_mime_type("image/webp"), None);
        assert_eq!(normalize_mime_type(""), None);
    }
}

//! Binding to the remote generation service.
//!
//! The assistant only talks to [`GenerationService`]; [`GeminiClient`] is the
//! production implementation.

pub mod error;
pub mod gemini;

pub use error::GenerationError;
pub use gemini::GeminiClient;

use async_trait::async_trait;

/// One ordered element of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    Image { mime_type: String, data: Vec<u8> },
    Text(String),
}

/// A single-turn request: zero or one image followed by exactly one text part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    parts: Vec<RequestPart>,
}

impl GenerationRequest {
    /// Image part first, instruction text second.
    pub fn with_image(mime_type: impl Into<String>, data: Vec<u8>, text: impl Into<String>) -> Self {
        Self {
            parts: vec![
                RequestPart::Image {
                    mime_type: mime_type.into(),
                    data,
                },
                RequestPart::Text(text.into()),
            ],
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![RequestPart::Text(text.into())],
        }
    }

    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, RequestPart::Image { .. }))
            .count()
    }

    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            RequestPart::Text(t) => Some(t.as_str()),
            RequestPart::Image { .. } => None,
        })
    }
}

/// What came back from a call that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Non-blank text, kept verbatim
    Text(String),
    /// A candidate was returned but carried no text
    Empty,
    /// No candidate at all
    Absent,
    /// Prompt or candidate stopped by a safety filter
    Blocked { reason: String },
}

impl Completion {
    pub fn text(&self) -> Option<&str> {
        match self {
            Completion::Text(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Completion, GenerationError>;
}

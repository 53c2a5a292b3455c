//! Domain profiles
//!
//! A profile carries everything that differs between the human-medical and the
//! veterinary deployment: prompt templates, labels, theming and the default model.
//! The front-end code is shared.

mod prompts;

pub use prompts::PromptOverrides;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Placeholder substituted with the user's question in chat templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Heading shown above an image analysis.
pub const ANALYSIS_HEADING: &str = "Detailed analysis based on the uploaded image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    #[serde(alias = "medico")]
    Medical,
    #[serde(alias = "vet")]
    Veterinary,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Medical => write!(f, "medical"),
            ProfileKind::Veterinary => write!(f, "veterinary"),
        }
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "medical" | "medico" => Ok(ProfileKind::Medical),
            "veterinary" | "vet" => Ok(ProfileKind::Veterinary),
            other => Err(format!(
                "Unknown profile '{}'. Expected 'medical' or 'veterinary'",
                other
            )),
        }
    }
}

/// Colour palette for the web UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub header_text: &'static str,
    pub accent: &'static str,
    pub accent_hover: &'static str,
    pub input_background: &'static str,
    pub input_text: &'static str,
    pub input_border: &'static str,
}

impl Theme {
    fn dark() -> Self {
        Self {
            background: "#121212",
            surface: "#1E1E2E",
            text: "#e0e0e0",
            header_text: "#4A90E2",
            accent: "#4A90E2",
            accent_hover: "#357ABD",
            input_background: "#dfe3e8",
            input_text: "#000000",
            input_border: "#4A90E2",
        }
    }

    fn light() -> Self {
        Self {
            background: "#f7f8fa",
            surface: "#ffffff",
            text: "#1f1f1f",
            header_text: "#4a4e69",
            accent: "#4a4e69",
            accent_hover: "#22223b",
            input_background: "#f1f1f1",
            input_text: "#000000",
            input_border: "#dcdcdc",
        }
    }

    /// CSS custom properties consumed by the embedded stylesheet.
    pub fn css_variables(&self) -> String {
        format!(
            ":root {{ --bg: {}; --surface: {}; --text: {}; --header-text: {}; --accent: {}; \
             --accent-hover: {}; --input-bg: {}; --input-text: {}; --input-border: {}; }}",
            self.background,
            self.surface,
            self.text,
            self.header_text,
            self.accent,
            self.accent_hover,
            self.input_background,
            self.input_text,
            self.input_border,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainProfile {
    pub kind: ProfileKind,
    pub page_title: &'static str,
    pub page_icon: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub assistant_name: &'static str,
    pub chat_blurb: &'static str,
    pub chat_placeholder: &'static str,
    pub note: &'static str,
    pub footer: &'static str,
    pub default_model: String,
    pub theme: Theme,
    #[serde(skip)]
    pub analysis_prompt: String,
    #[serde(skip)]
    pub chat_prompt: String,
}

impl DomainProfile {
    pub fn builtin(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Medical => Self::medical(),
            ProfileKind::Veterinary => Self::veterinary(),
        }
    }

    pub fn medical() -> Self {
        Self {
            kind: ProfileKind::Medical,
            page_title: "Medical Assistant",
            page_icon: "🩺",
            title: "HealthLens 🩺",
            subtitle: "Your Health Your Control",
            assistant_name: "Kairos",
            chat_blurb: "Ask any medical-related questions about human health, wellness, and care.",
            chat_placeholder: "Ask Kairos",
            note: "The chatbot is for informational purposes only. Always consult a doctor for specific concerns.",
            footer: "Made with ❤️ for Healthcare",
            default_model: "gemini-2.0-flash".to_string(),
            theme: Theme::dark(),
            analysis_prompt: include_str!("templates/medical_analysis.md").to_string(),
            chat_prompt: include_str!("templates/medical_chat.md").to_string(),
        }
    }

    pub fn veterinary() -> Self {
        Self {
            kind: ProfileKind::Veterinary,
            page_title: "Medical Assistant",
            page_icon: "🩺",
            title: "HealthLens",
            subtitle: "An AI-Powered Medical Diagnosis",
            assistant_name: "Bot",
            chat_blurb: "Ask any medical-related questions about animal care and health.",
            chat_placeholder: "",
            note: "The chatbot is for informational purposes only. Always consult a professional veterinarian for specific concerns.",
            footer: "Made with ❤️ for healthcare",
            default_model: "gemini-1.5-pro-latest".to_string(),
            theme: Theme::light(),
            analysis_prompt: include_str!("templates/veterinary_analysis.md").to_string(),
            chat_prompt: include_str!("templates/veterinary_chat.md").to_string(),
        }
    }

    /// Chat template with the query substituted verbatim.
    pub fn chat_prompt_for(&self, query: &str) -> String {
        self.chat_prompt.replace(QUERY_PLACEHOLDER, query)
    }

    /// Replace built-in templates with `analysis.md` / `chat.md` from `dir`.
    pub fn apply_prompt_dir(&mut self, dir: &Path) -> Result<()> {
        let overrides = PromptOverrides::load_from_dir(dir)?;

        if let Some(analysis) = overrides.get("analysis") {
            if analysis.trim().is_empty() {
                anyhow::bail!("Analysis prompt override in {} is empty", dir.display());
            }
            self.analysis_prompt = analysis.clone();
            info!("Using analysis prompt override from {}", dir.display());
        }

        if let Some(chat) = overrides.get("chat") {
            if !chat.contains(QUERY_PLACEHOLDER) {
                anyhow::bail!(
                    "Chat prompt override in {} must contain the {} placeholder",
                    dir.display(),
                    QUERY_PLACEHOLDER
                );
            }
            self.chat_prompt = chat.clone();
            info!("Using chat prompt override from {}", dir.display());
        }

        Ok(())
    }
}

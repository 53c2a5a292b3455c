pub mod models;

pub use models::*;


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::profile::{DomainProfile, ProfileKind};

/// Environment variable consulted when `gemini.api_key` is empty.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default = "default_safety_settings")]
    pub safety: Vec<SafetySetting>,

    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Supports `${VAR}` / `$VAR` expansion
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Overrides the profile's default model when set
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub kind: ProfileKind,

    /// Directory holding `analysis.md` and/or `chat.md` overrides
    #[serde(default)]
    pub prompt_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle minutes before a chat session and its transcript are dropped
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_seconds() -> u64 {
    120
}
fn default_port() -> u16 {
    31380
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_max_sessions() -> usize {
    100
}
fn default_session_timeout_minutes() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            generation: GenerationConfig::default(),
            safety: default_safety_settings(),
            profile: ProfileConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
            model: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            max_sessions: default_max_sessions(),
            session_timeout_minutes: default_session_timeout_minutes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from the default location, creating a commented template on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = Self::read_from(&path)?;

        // Expand environment variables in the API key
        config.expand_env_vars();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Parse the file as written, without env expansion or validation.
    /// A missing file is created from the template.
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::write_template(path)?;
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gemini.base_url.trim().is_empty() {
            anyhow::bail!("gemini.base_url cannot be empty");
        }
        if let Some(ref model) = self.gemini.model {
            if model.trim().is_empty() {
                anyhow::bail!("gemini.model cannot be empty when set");
            }
        }
        if self.gemini.timeout_seconds == 0 {
            anyhow::bail!("gemini.timeout_seconds must be greater than 0");
        }

        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            anyhow::bail!(
                "generation.temperature must be between 0.0 and 2.0 (got {})",
                generation.temperature
            );
        }
        if !(0.0..=1.0).contains(&generation.top_p) {
            anyhow::bail!(
                "generation.top_p must be between 0.0 and 1.0 (got {})",
                generation.top_p
            );
        }
        if generation.max_output_tokens == 0 {
            anyhow::bail!("generation.max_output_tokens must be greater than 0");
        }

        for (i, setting) in self.safety.iter().enumerate() {
            if self.safety[..i]
                .iter()
                .any(|other| other.category == setting.category)
            {
                anyhow::bail!("Duplicate safety setting for {:?}", setting.category);
            }
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be greater than 0");
        }
        if self.server.max_sessions == 0 {
            anyhow::bail!("server.max_sessions must be greater than 0");
        }

        Ok(())
    }

    /// Resolve the API credential, falling back to `GEMINI_API_KEY`.
    pub fn api_key(&self) -> Result<String> {
        let key = self.gemini.api_key.trim();
        if !key.is_empty() && !key.starts_with('$') {
            return Ok(key.to_string());
        }

        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => anyhow::bail!(
                "Gemini API key is missing. Set gemini.api_key in the config file or export {}",
                API_KEY_ENV
            ),
        }
    }

    /// Model to call for the given profile.
    pub fn model_for(&self, profile: &DomainProfile) -> String {
        self.gemini
            .model
            .clone()
            .unwrap_or_else(|| profile.default_model.clone())
    }

    /// Build the active domain profile, applying prompt overrides if configured.
    pub fn domain_profile(&self) -> Result<DomainProfile> {
        let mut profile = DomainProfile::builtin(self.profile.kind);
        if let Some(ref dir) = self.profile.prompt_dir {
            let expanded = shellexpand::tilde(dir).to_string();
            profile.apply_prompt_dir(Path::new(&expanded))?;
        }
        Ok(profile)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// Write the commented default template (first-time setup)
    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

        Ok(base.home_dir().join(".healthlens").join("config.toml"))
    }

    fn expand_env_vars(&mut self) {
        self.gemini.api_key = expand_env(&self.gemini.api_key);
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["gemini", "api_key"] => Ok(mask_secret(&self.gemini.api_key)),
            ["gemini", "base_url"] => Ok(self.gemini.base_url.clone()),
            ["gemini", "model"] => Ok(self.gemini.model.clone().unwrap_or_default()),
            ["gemini", "timeout_seconds"] => Ok(self.gemini.timeout_seconds.to_string()),
            ["generation", "temperature"] => Ok(self.generation.temperature.to_string()),
            ["generation", "top_p"] => Ok(self.generation.top_p.to_string()),
            ["generation", "top_k"] => Ok(self.generation.top_k.to_string()),
            ["generation", "max_output_tokens"] => {
                Ok(self.generation.max_output_tokens.to_string())
            }
            ["profile", "kind"] => Ok(self.profile.kind.to_string()),
            ["profile", "prompt_dir"] => Ok(self.profile.prompt_dir.clone().unwrap_or_default()),
            ["server", "port"] => Ok(self.server.port.to_string()),
            ["server", "bind"] => Ok(self.server.bind.clone()),
            ["server", "max_upload_bytes"] => Ok(self.server.max_upload_bytes.to_string()),
            ["server", "max_sessions"] => Ok(self.server.max_sessions.to_string()),
            ["server", "session_timeout_minutes"] => {
                Ok(self.server.session_timeout_minutes.to_string())
            }
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["gemini", "api_key"] => self.gemini.api_key = value.to_string(),
            ["gemini", "base_url"] => self.gemini.base_url = value.to_string(),
            ["gemini", "model"] => {
                self.gemini.model = (!value.is_empty()).then(|| value.to_string())
            }
            ["gemini", "timeout_seconds"] => self.gemini.timeout_seconds = value.parse()?,
            ["generation", "temperature"] => self.generation.temperature = value.parse()?,
            ["generation", "top_p"] => self.generation.top_p = value.parse()?,
            ["generation", "top_k"] => self.generation.top_k = value.parse()?,
            ["generation", "max_output_tokens"] => {
                self.generation.max_output_tokens = value.parse()?
            }
            ["profile", "kind"] => {
                self.profile.kind = value.parse().map_err(|e: String| anyhow::anyhow!(e))?
            }
            ["profile", "prompt_dir"] => {
                self.profile.prompt_dir = (!value.is_empty()).then(|| value.to_string())
            }
            ["server", "port"] => self.server.port = value.parse()?,
            ["server", "bind"] => self.server.bind = value.to_string(),
            ["server", "max_upload_bytes"] => self.server.max_upload_bytes = value.parse()?,
            ["server", "max_sessions"] => self.server.max_sessions = value.parse()?,
            ["server", "session_timeout_minutes"] => {
                self.server.session_timeout_minutes = value.parse()?
            }
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

fn expand_env(s: &str) -> String {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else if let Some(var_name) = s.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else {
        s.to_string()
    }
}

fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    match count {
        0 => String::new(),
        1..=8 => "****".to_string(),
        _ => {
            let tail: String = secret.chars().skip(count - 4).collect();
            format!("****{}", tail)
        }
    }
}

/// Default config template with helpful comments (used for first-time setup)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# HealthLens Configuration
# Auto-created on first run. Keep this file out of version control.

[gemini]
# API key for the Gemini API. Leave empty to read GEMINI_API_KEY instead.
api_key = "${GEMINI_API_KEY}"
base_url = "https://generativelanguage.googleapis.com/v1beta"
# Defaults to the profile's model (gemini-2.0-flash / gemini-1.5-pro-latest)
# model = "gemini-2.0-flash"
timeout_seconds = 120

[generation]
temperature = 1.0
top_p = 0.95
top_k = 0              # 0 = disabled
max_output_tokens = 8192

# Safety filters (one entry per category)
[[safety]]
category = "HARM_CATEGORY_HARASSMENT"
threshold = "BLOCK_MEDIUM_AND_ABOVE"

[[safety]]
category = "HARM_CATEGORY_HATE_SPEECH"
threshold = "BLOCK_MEDIUM_AND_ABOVE"

[[safety]]
category = "HARM_CATEGORY_SEXUALLY_EXPLICIT"
threshold = "BLOCK_MEDIUM_AND_ABOVE"

[[safety]]
category = "HARM_CATEGORY_DANGEROUS_CONTENT"
threshold = "BLOCK_MEDIUM_AND_ABOVE"

[profile]
# "medical" (human health) or "veterinary" (animal health)
kind = "medical"
# Optional directory with analysis.md / chat.md prompt overrides.
# chat.md must contain the {query} placeholder.
# prompt_dir = "~/.healthlens/prompts"

[server]
port = 31380
bind = "127.0.0.1"
max_upload_bytes = 20971520
max_sessions = 100
session_timeout_minutes = 30

[logging]
level = "info"
"#;

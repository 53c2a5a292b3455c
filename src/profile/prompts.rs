use anyhow::Result;
use glob::glob;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const KNOWN_PROMPTS: &[&str] = &["analysis", "chat"];

/// Prompt templates read from `*.md` files, keyed by file stem.
#[derive(Debug, Default)]
pub struct PromptOverrides {
    prompts: HashMap<String, String>,
}

impl PromptOverrides {
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut overrides = Self::default();

        if !dir.exists() {
            warn!("Prompt directory not found: {}", dir.display());
            return Ok(overrides);
        }

        let pattern = dir.join("*.md");
        let pattern_str = pattern
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid prompt directory path"))?;

        for entry in glob(pattern_str)? {
            match entry {
                Ok(path) => {
                    let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    if !KNOWN_PROMPTS.contains(&id) {
                        warn!("Ignoring unknown prompt file: {}", path.display());
                        continue;
                    }

                    let content = std::fs::read_to_string(&path)?;
                    debug!("Loaded prompt override: {}", id);
                    overrides.prompts.insert(id.to_string(), content);
                }
                Err(e) => warn!("Error reading prompt file: {}", e),
            }
        }

        Ok(overrides)
    }

    pub fn get(&self, id: &str) -> Option<&String> {
        self.prompts.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

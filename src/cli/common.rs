use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use healthlens::config::Config;
use healthlens::generation::GeminiClient;
use healthlens::Assistant;

use super::GlobalOpts;

pub fn config_path(opts: &GlobalOpts) -> Result<PathBuf> {
    match opts.config {
        Some(ref path) => Ok(PathBuf::from(shellexpand::tilde(path).to_string())),
        None => Config::config_path(),
    }
}

/// Load the config file and apply command-line overrides.
pub fn load_config(opts: &GlobalOpts) -> Result<Config> {
    let path = config_path(opts)?;
    let mut config = Config::load_from(Some(&path))?;
    if let Some(kind) = opts.profile {
        config.profile.kind = kind;
    }
    Ok(config)
}

/// Assistant wired to the Gemini API, plus the model it will call.
pub fn build_assistant(config: &Config) -> Result<(Assistant, String)> {
    let profile = config.domain_profile()?;
    let client = GeminiClient::from_config(config, &profile)?;
    let model = client.model().to_string();
    Ok((Assistant::new(profile, Arc::new(client)), model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthlens::profile::ProfileKind;
    use tempfile::TempDir;

    #[test]
    fn test_profile_flag_overrides_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profile]\nkind = \"medical\"\n").unwrap();

        let opts = GlobalOpts {
            config: Some(path.to_string_lossy().to_string()),
            profile: Some(ProfileKind::Veterinary),
        };
        let config = load_config(&opts).unwrap();
        assert_eq!(config.profile.kind, ProfileKind::Veterinary);
    }
}

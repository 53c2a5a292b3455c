use anyhow::Result;
use clap::{Args, Subcommand};

use healthlens::config::Config;

use super::{common, GlobalOpts};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default config template
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print a single value (dotted key, e.g. server.port)
    Get { key: String },

    /// Set a single value and save
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}

pub async fn run(args: ConfigArgs, opts: &GlobalOpts) -> Result<()> {
    let path = common::config_path(opts)?;

    match args.command {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::write_template(&path)?;
        }
        ConfigCommands::Show => {
            let mut config = common::load_config(opts)?;
            config.gemini.api_key = config.get_value("gemini.api_key")?;
            println!("# {}", path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Get { key } => {
            let config = common::load_config(opts)?;
            println!("{}", config.get_value(&key)?);
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::read_from(&path)?;
            config.set_value(&key, &value)?;
            config.validate()?;
            config.save_to(&path)?;
            println!("Set {} in {}", key, path.display());
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

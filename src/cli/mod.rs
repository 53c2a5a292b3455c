pub mod analyze;
pub mod ask;
pub mod chat;
pub mod common;
pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};
use healthlens::profile::ProfileKind;

#[derive(Parser)]
#[command(name = "healthlens")]
#[command(author, version, about = "Image analysis and chat assistant for human and animal health")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "HEALTHLENS_CONFIG")]
    pub config: Option<String>,

    /// Domain profile: medical or veterinary (overrides config)
    #[arg(short, long, global = true, env = "HEALTHLENS_PROFILE")]
    pub profile: Option<ProfileKind>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web UI
    Serve(serve::ServeArgs),

    /// Analyze a single image
    Analyze(analyze::AnalyzeArgs),

    /// Ask a single question
    Ask(ask::AskArgs),

    /// Start an interactive chat session
    Chat(chat::ChatArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Options shared by every subcommand.
pub struct GlobalOpts {
    pub config: Option<String>,
    pub profile: Option<ProfileKind>,
}

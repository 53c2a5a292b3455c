use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{Cli, Commands, GlobalOpts};
use healthlens::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let opts = GlobalOpts {
        config: cli.config.clone(),
        profile: cli.profile,
    };

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        configured_log_level(&opts)
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve(args) => cli::serve::run(args, &opts).await,
        Commands::Analyze(args) => cli::analyze::run(args, &opts).await,
        Commands::Ask(args) => cli::ask::run(args, &opts).await,
        Commands::Chat(args) => cli::chat::run(args, &opts).await,
        Commands::Config(args) => cli::config::run(args, &opts).await,
    }
}

/// `logging.level` from the config file, if it can be read.
fn configured_log_level(opts: &GlobalOpts) -> String {
    cli::common::config_path(opts)
        .ok()
        .filter(|path| path.exists())
        .and_then(|path| Config::read_from(&path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| "info".to_string())
}

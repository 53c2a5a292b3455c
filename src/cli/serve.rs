use anyhow::Result;
use clap::Args;

use healthlens::server::Server;

use super::{common, GlobalOpts};

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs, opts: &GlobalOpts) -> Result<()> {
    let mut config = common::load_config(opts)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let server = Server::new(&config)?;
    println!(
        "HealthLens ({}) listening on http://{}:{}",
        config.profile.kind, config.server.bind, config.server.port
    );
    server.run().await
}

use anyhow::Result;
use clap::Args;

use healthlens::Transcript;

use super::{common, GlobalOpts};

#[derive(Args)]
pub struct AskArgs {
    /// The question to ask
    pub question: String,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: AskArgs, opts: &GlobalOpts) -> Result<()> {
    let config = common::load_config(opts)?;
    let (assistant, _model) = common::build_assistant(&config)?;

    let mut transcript = Transcript::new();
    let exchange = assistant
        .submit_chat_query(&mut transcript, &args.question)
        .await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(exchange)?);
    } else {
        println!("{}", exchange.bot);
    }

    Ok(())
}

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use healthlens::UploadedImage;

use super::{common, GlobalOpts};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// PNG or JPEG image to analyze
    pub image: PathBuf,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: AnalyzeArgs, opts: &GlobalOpts) -> Result<()> {
    let config = common::load_config(opts)?;
    let (assistant, model) = common::build_assistant(&config)?;

    let path = PathBuf::from(shellexpand::tilde(&args.image.to_string_lossy()).to_string());
    let image = UploadedImage::from_path(&path).await?;

    tracing::debug!("Analyzing {} with {}", path.display(), model);
    let analysis = assistant.submit_image_analysis(image).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("# {}\n", analysis.heading);
        println!("{}", analysis.text);
    }

    Ok(())
}

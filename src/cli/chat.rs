use anyhow::Result;
use clap::Args;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use healthlens::assistant::render_transcript_text;
use healthlens::{AssistantError, Transcript};

use super::{common, GlobalOpts};

#[derive(Args)]
pub struct ChatArgs {}

pub async fn run(_args: ChatArgs, opts: &GlobalOpts) -> Result<()> {
    let config = common::load_config(opts)?;
    let (assistant, model) = common::build_assistant(&config)?;
    let profile = assistant.profile().clone();

    println!("{} - {} ({})", profile.title, profile.subtitle, model);
    println!("{}", profile.chat_blurb);
    println!("Commands: /history, /quit\n");

    let mut rl = DefaultEditor::new()?;
    let mut transcript = Transcript::new();

    loop {
        let input = match rl.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        match input.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                if transcript.is_empty() {
                    println!("(no messages yet)\n");
                } else {
                    print!("{}", render_transcript_text(&transcript, &profile));
                }
                continue;
            }
            _ => {}
        }

        let _ = rl.add_history_entry(input.as_str());

        match assistant.submit_chat_query(&mut transcript, &input).await {
            Ok(exchange) => println!("{}: {}\n", profile.assistant_name, exchange.bot),
            Err(AssistantError::EmptyQuery) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    println!("\n{}", profile.note);
    Ok(())
}

//! One-shot "say" command

use std::error::Error;

use crate::cli::CliContext;
use crate::core::dispatcher::SendOutcome;

pub async fn run_say(ctx: &CliContext, prompt: Vec<String>) -> Result<(), Box<dyn Error>> {
    let mut draft = prompt.join(" ");
    if draft.trim().is_empty() {
        eprintln!("Usage: chatops say <prompt>");
        std::process::exit(1);
    }

    // Routing to the local server needs a fresh model list.
    ctx.session.refresh_models().await;

    match ctx.session.send(&mut draft).await {
        SendOutcome::Delivered => {
            if let Some(reply) = ctx.session.entries().last() {
                println!("{}", reply.text);
            }
            Ok(())
        }
        SendOutcome::Failed(reason) => {
            eprintln!("❌ Error: {reason}");
            std::process::exit(1);
        }
        other => Err(format!("message was not sent: {other:?}").into()),
    }
}

//! Model listing functionality
//!
//! Lists the models the local server exposes through the backend.

use std::error::Error;

use crate::cli::CliContext;
use crate::core::probe::ProbeOutcome;

pub fn format_model_list(models: &[String], preferred: &str) -> Vec<String> {
    models
        .iter()
        .map(|model| {
            if model == preferred {
                format!("  • {model} (preferred)")
            } else {
                format!("  • {model}")
            }
        })
        .collect()
}

pub async fn list_models(ctx: &CliContext) -> Result<(), Box<dyn Error>> {
    let server_url = ctx
        .session
        .with_state(|state| state.preferences.preferences().local_server_url.clone());

    println!("🤖 Local models at {server_url}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    match ctx.session.refresh_models().await {
        ProbeOutcome::Online { models, selected } => {
            if models.is_empty() {
                println!("No models found on the local server.");
                return Ok(());
            }
            if let Some(model) = &selected {
                println!("🎯 Preferred local model was not available; now using {model}");
                println!();
            }
            let preferred = ctx
                .session
                .with_state(|state| state.preferences.preferences().local_model.clone());
            println!("Found {} models:", models.len());
            for line in format_model_list(&models, &preferred) {
                println!("{line}");
            }
            Ok(())
        }
        ProbeOutcome::Offline { reason } => {
            Err(format!("Local server unavailable ({}): {reason}", ctx.backend_url).into())
        }
    }
}

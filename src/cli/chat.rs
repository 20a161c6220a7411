//! Interactive line console.
//!
//! Input is read from stdin while a send is pending so the busy guard and
//! slash commands stay usable. Replies are printed as they land.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::render::{format_entry, print_status, provider_line};
use crate::cli::CliContext;
use crate::core::dispatcher::SendOutcome;
use crate::core::preferences::PreferenceKey;
use crate::core::probe::{spawn_health_poller, ProbeOutcome};
use crate::core::providers::Provider;
use crate::core::session::ConsoleSession;
use crate::utils::logging::TranscriptLog;

const HELP_TEXT: &str = "\
Console commands:
  /help                 Show this list
  /status               Provider, routing and backend health
  /refresh              Re-fetch the local model list
  /provider <name>      Switch between 'hosted' and 'local'
  /model <name>         Set the model for the current provider
  /temp <0..1>          Set the sampling temperature
  /key <key>            Set the hosted API key
  /server <url>         Set the local server URL
  /log [file]           Start logging to a file, or pause/resume it
  /reset                Start the conversation over
  /quit                 Leave the console";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Message(String),
    Help,
    Status,
    Refresh,
    Provider(Option<String>),
    Model(Option<String>),
    Temperature(Option<String>),
    Key(Option<String>),
    Server(Option<String>),
    Log(Option<String>),
    Reset,
    Quit,
    Unknown(String),
    Blank,
}

pub fn parse_input(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Blank;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ConsoleInput::Message(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim().to_string()).filter(|r| !r.is_empty())),
        None => (command, None),
    };

    match name.to_ascii_lowercase().as_str() {
        "help" | "?" => ConsoleInput::Help,
        "status" => ConsoleInput::Status,
        "refresh" | "models" => ConsoleInput::Refresh,
        "provider" => ConsoleInput::Provider(rest),
        "model" => ConsoleInput::Model(rest),
        "temp" | "temperature" => ConsoleInput::Temperature(rest),
        "key" => ConsoleInput::Key(rest),
        "server" => ConsoleInput::Server(rest),
        "log" => ConsoleInput::Log(rest),
        "reset" | "clear" => ConsoleInput::Reset,
        "quit" | "exit" | "q" => ConsoleInput::Quit,
        other => ConsoleInput::Unknown(other.to_string()),
    }
}

struct Console {
    session: Arc<ConsoleSession>,
    transcript: TranscriptLog,
    backend_url: String,
    /// Number of conversation entries already printed.
    shown: usize,
}

impl Console {
    fn print_new_entries(&mut self) {
        let entries = self.session.entries();
        if self.shown > entries.len() {
            self.shown = 0;
        }
        for entry in &entries[self.shown..] {
            println!("{}", format_entry(entry));
            println!();
            if let Err(err) = self.transcript.log_entry(entry) {
                warn!("Failed to write transcript: {err}");
            }
        }
        self.shown = entries.len();
    }

    fn report_send(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Delivered | SendOutcome::Failed(_) => self.print_new_entries(),
            SendOutcome::Discarded => println!("## Reply dropped after reset"),
            SendOutcome::Busy => println!("⏳ Still waiting for the previous reply"),
            SendOutcome::Empty => {}
        }
        if let SendOutcome::Failed(reason) = outcome {
            eprintln!("❌ {reason}");
        }
    }

    async fn refresh(&self) {
        match self.session.refresh_models().await {
            ProbeOutcome::Online { models, selected } => {
                println!("✅ Local server online: {} model(s)", models.len());
                if let Some(model) = selected {
                    println!("   Local model set to {model}");
                }
            }
            ProbeOutcome::Offline { reason } => println!("⚠️  Local server offline: {reason}"),
        }
    }

    fn set_preference(&self, key: PreferenceKey, value: Option<String>) {
        let Some(value) = value else {
            let current = self
                .session
                .with_state(|state| state.preferences.display_value(key));
            println!("{key}: {current}");
            return;
        };
        match self.session.update_preferences(|prefs| prefs.apply(key, &value)) {
            Ok(()) => {
                let shown = self
                    .session
                    .with_state(|state| state.preferences.display_value(key));
                println!("✅ {key} = {shown}");
            }
            Err(err) => eprintln!("❌ {err}"),
        }
    }

    fn set_model(&self, value: Option<String>) {
        let provider = self
            .session
            .with_state(|state| state.preferences.preferences().provider);
        let key = match provider {
            Provider::Hosted => PreferenceKey::HostedModel,
            Provider::Local => PreferenceKey::LocalModel,
        };
        self.set_preference(key, value);
    }

    fn toggle_log(&mut self, file: Option<String>) {
        let result = match file {
            Some(path) => self.transcript.set_log_file(path),
            None => self.transcript.toggle_logging("Logging paused"),
        };
        match result {
            Ok(message) => println!("## {message}"),
            Err(err) => eprintln!("❌ {err}"),
        }
    }

    fn print_status(&self) {
        print_status(&self.session.status(), &self.backend_url);
        println!("Transcript:    {}", self.transcript.get_status_string());
    }

    fn reset(&mut self) {
        self.session.reset();
        if let Err(err) = self.transcript.log_note("Conversation reset") {
            warn!("Failed to write transcript: {err}");
        }
        self.shown = 0;
        self.print_new_entries();
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub async fn run_chat(ctx: &CliContext, transcript: TranscriptLog) -> Result<(), Box<dyn Error>> {
    let mut console = Console {
        session: ctx.session.clone(),
        transcript,
        backend_url: ctx.backend_url.clone(),
        shown: 0,
    };

    println!("💬 chatops console ({})", console.backend_url);
    println!("Type /help for commands, /quit to leave.");
    println!();
    console.refresh().await;
    println!("{}", provider_line(&console.session.status()));
    println!();
    console.print_new_entries();

    let cancel = CancellationToken::new();
    let poller = spawn_health_poller(
        console.session.backend(),
        console.session.shared_state(),
        ctx.config.health_poll_interval(),
        cancel.clone(),
    );

    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<SendOutcome>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    ConsoleInput::Blank => {}
                    ConsoleInput::Quit => break,
                    ConsoleInput::Message(text) => {
                        if console.session.is_busy() {
                            console.report_send(SendOutcome::Busy);
                        } else {
                            let session = console.session.clone();
                            let tx = outcome_tx.clone();
                            tokio::spawn(async move {
                                let mut draft = text;
                                let outcome = session.send(&mut draft).await;
                                let _ = tx.send(outcome);
                            });
                        }
                    }
                    ConsoleInput::Help => println!("{HELP_TEXT}"),
                    ConsoleInput::Status => console.print_status(),
                    ConsoleInput::Refresh => console.refresh().await,
                    ConsoleInput::Provider(value) => console.set_preference(PreferenceKey::Provider, value),
                    ConsoleInput::Model(value) => console.set_model(value),
                    ConsoleInput::Temperature(value) => console.set_preference(PreferenceKey::Temperature, value),
                    ConsoleInput::Key(value) => console.set_preference(PreferenceKey::HostedApiKey, value),
                    ConsoleInput::Server(value) => console.set_preference(PreferenceKey::LocalServerUrl, value),
                    ConsoleInput::Log(file) => console.toggle_log(file),
                    ConsoleInput::Reset => console.reset(),
                    ConsoleInput::Unknown(name) => eprintln!("❌ Unknown command: /{name} (try /help)"),
                }
                prompt();
            }
            Some(outcome) = outcome_rx.recv() => {
                console.report_send(outcome);
                prompt();
            }
        }
    }

    cancel.cancel();
    if let Err(err) = poller.await {
        warn!("Health poller stopped abnormally: {err}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_input("  hello there "),
            ConsoleInput::Message("  hello there ".to_string())
        );
        assert_eq!(parse_input("   "), ConsoleInput::Blank);
    }

    #[test]
    fn commands_take_optional_arguments() {
        assert_eq!(
            parse_input("/provider local"),
            ConsoleInput::Provider(Some("local".to_string()))
        );
        assert_eq!(parse_input("/provider"), ConsoleInput::Provider(None));
        assert_eq!(parse_input("/provider   "), ConsoleInput::Provider(None));
        assert_eq!(
            parse_input("/model  llama3:8b "),
            ConsoleInput::Model(Some("llama3:8b".to_string()))
        );
        assert_eq!(
            parse_input("/log /tmp/chat.log"),
            ConsoleInput::Log(Some("/tmp/chat.log".to_string()))
        );
    }

    #[test]
    fn command_names_are_case_insensitive_with_aliases() {
        assert_eq!(parse_input("/QUIT"), ConsoleInput::Quit);
        assert_eq!(parse_input("/exit"), ConsoleInput::Quit);
        assert_eq!(parse_input("/clear"), ConsoleInput::Reset);
        assert_eq!(parse_input("/temp 0.3"), ConsoleInput::Temperature(Some("0.3".to_string())));
        assert_eq!(
            parse_input("/frobnicate"),
            ConsoleInput::Unknown("frobnicate".to_string())
        );
    }
}

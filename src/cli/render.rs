//! Plain-text rendering shared by the console and one-shot commands.

use crate::core::message::ChatEntry;
use crate::core::providers::ProviderBadge;
use crate::core::session::StatusSnapshot;

pub fn format_entry(entry: &ChatEntry) -> String {
    let mut rendered = format!("[{}] {}", entry.author_tag, entry.text);
    if let Some(meta) = &entry.meta {
        rendered.push_str(&format!("\n    ({})", meta.label()));
    }
    rendered
}

pub fn print_entries(entries: &[ChatEntry]) {
    for entry in entries {
        println!("{}", format_entry(entry));
        println!();
    }
}

/// One-line summary of the stored provider, e.g. `Hosted API [KEY?]`.
///
/// The badge describes the stored provider, not the one the next request is
/// routed to.
pub fn provider_line(status: &StatusSnapshot) -> String {
    format!(
        "{} [{}]",
        status.stored_provider.display_name(),
        status.badge.label()
    )
}

pub fn format_status(status: &StatusSnapshot, backend_url: &str) -> String {
    let mut lines = vec![
        format!("Namespace:     {}", status.namespace),
        format!("Backend:       {backend_url}"),
        format!("Provider:      {}", provider_line(status)),
        format!(
            "Next request:  {} / {}",
            status.resolution.provider.wire_name(),
            status.resolution.model
        ),
        format!(
            "Local server:  {} ({} models)",
            status.local.status.as_str(),
            status.local.available.len()
        ),
        format!(
            "Last call:     {}",
            match status.last_call_ok {
                Some(true) => "ok",
                Some(false) => "failed",
                None => "none yet",
            }
        ),
        format!("Entries:       {}", status.entries),
        format!("AI requests:   {}", status.request_count),
    ];
    if let Some(error) = &status.error {
        lines.push(format!("Error:         {error}"));
    }
    if !status.recent_errors.is_empty() {
        lines.push("Recent errors:".to_string());
        lines.extend(status.recent_errors.iter().map(|error| format!("  - {error}")));
    }
    if status.badge == ProviderBadge::MissingKey {
        lines.push("💡 Set a key with: chatops set hosted-api-key <key>".to_string());
    }
    lines.join("\n")
}

pub fn print_status(status: &StatusSnapshot, backend_url: &str) {
    println!("{}", format_status(status, backend_url));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::ReplyMeta;
    use crate::core::probe::LocalModels;
    use crate::core::providers::{LocalServerStatus, Provider, Resolution};

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            namespace: "chatops".to_string(),
            stored_provider: Provider::Local,
            badge: ProviderBadge::Down,
            resolution: Resolution {
                provider: Provider::Hosted,
                model: "gpt-4o".to_string(),
            },
            local: LocalModels {
                available: Vec::new(),
                status: LocalServerStatus::Offline,
            },
            last_call_ok: Some(false),
            error: Some("HTTP 502".to_string()),
            entries: 4,
            request_count: 7,
            recent_errors: vec!["HTTP 502".to_string(), "Chat history cleared".to_string()],
        }
    }

    #[test]
    fn entry_shows_tag_and_meta() {
        let entry = ChatEntry::assistant("AI", "hi").with_meta(ReplyMeta {
            provider: Provider::Local,
            model: "llama3".to_string(),
            temperature: 0.5,
        });
        assert_eq!(format_entry(&entry), "[AI] hi\n    (ollama:llama3 • temp=0.50)");
        assert_eq!(format_entry(&ChatEntry::user("YOU", "yo")), "[YOU] yo");
    }

    #[test]
    fn status_lists_routing_and_error() {
        let status = snapshot();
        let text = format_status(&status, "http://localhost:8000");
        assert!(text.contains("Provider:      Local server [DOWN]"));
        assert!(text.contains("Next request:  openai / gpt-4o"));
        assert!(text.contains("Local server:  offline (0 models)"));
        assert!(text.contains("Last call:     failed"));
        assert!(text.contains("Error:         HTTP 502"));
        assert!(text.contains("AI requests:   7"));
        assert!(text.ends_with("Recent errors:\n  - HTTP 502\n  - Chat history cleared"));
        assert!(!text.contains("hosted-api-key"));
    }

    #[test]
    fn missing_key_adds_hint() {
        let status = StatusSnapshot {
            stored_provider: Provider::Hosted,
            badge: ProviderBadge::MissingKey,
            error: None,
            recent_errors: Vec::new(),
            ..snapshot()
        };
        let text = format_status(&status, "http://localhost:8000");
        assert!(text.contains("Hosted API [KEY?]"));
        assert!(text.contains("chatops set hosted-api-key"));
        assert!(!text.contains("Error:"));
        assert!(!text.contains("Recent errors"));
    }
}

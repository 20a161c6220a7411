use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding an `EnvFilter` directive, e.g. `chatops=debug`.
pub const LOG_FILTER_ENV: &str = "CHATOPS_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

pub fn env_filter(raw: Option<&str>, verbose: bool) -> EnvFilter {
    raw.filter(|directive| !directive.trim().is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. Diagnostics go to stderr so they never mix
/// with command output.
pub fn init_tracing(verbose: bool) {
    let raw = std::env::var(LOG_FILTER_ENV).ok();
    let filter = env_filter(raw.as_deref(), verbose);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_verbosity_default() {
        assert_eq!(env_filter(None, false).to_string(), "warn");
        assert_eq!(env_filter(None, true).to_string(), "debug");
        assert_eq!(env_filter(Some("  "), false).to_string(), "warn");
    }

    #[test]
    fn explicit_directive_wins() {
        assert_eq!(
            env_filter(Some("chatops=trace"), false).to_string(),
            "chatops=trace"
        );
    }
}

use crate::core::config::data::{path_display, Config};

fn print_optional(key: &str, value: Option<String>) {
    match value {
        Some(value) => println!("  {key}: {value}"),
        None => println!("  {key}: (unset)"),
    }
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        print_optional("backend-url", self.backend_url.clone());
        print_optional("backend-host", self.backend_host.clone());
        print_optional("namespace", self.namespace.clone());
        print_optional("storage-dir", self.storage_dir.as_ref().map(path_display));
        println!("  user-tag: {}", self.user_tag());
        println!("  assistant-tag: {}", self.assistant_tag());
        println!("  history-limit: {}", self.history_limit());
        println!(
            "  health-poll-secs: {}",
            self.health_poll_interval().as_secs()
        );
    }
}

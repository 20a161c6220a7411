use crate::core::message::ChatEntry;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Plain-text transcript of the conversation, appended as entries arrive.
pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    /// Start logging to `log_file` if one is given. The file is created up
    /// front so permission problems surface immediately.
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn Error>> {
        let mut log = TranscriptLog {
            file_path: None,
            is_active: false,
        };
        if let Some(path) = log_file {
            log.set_log_file(path)?;
        }
        Ok(log)
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn Error>> {
        test_file_access(&path)?;

        self.file_path = Some(path.clone());
        self.is_active = true;

        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(&mut self, pause_message: &str) -> Result<String, Box<dyn Error>> {
        match &self.file_path {
            Some(path) => {
                let path = path.clone();
                if self.is_active {
                    self.log_note(pause_message)?;
                    self.is_active = false;
                    Ok(format!("Logging paused (file: {path})"))
                } else {
                    self.is_active = true;
                    Ok(format!("Logging resumed to: {path}"))
                }
            }
            None => Err("No log file specified. Use /log <filename> to enable logging first.".into()),
        }
    }

    pub fn log_entry(&self, entry: &ChatEntry) -> Result<(), Box<dyn Error>> {
        self.write_block(&format!("{}: {}", entry.author_tag, entry.text))
    }

    /// Record a console event such as a reset, prefixed with `##`.
    pub fn log_note(&self, note: &str) -> Result<(), Box<dyn Error>> {
        self.write_block(&format!("## {note}"))
    }

    fn write_block(&self, content: &str) -> Result<(), Box<dyn Error>> {
        let file_path = match (&self.file_path, self.is_active) {
            (Some(path), true) => path,
            _ => return Ok(()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    /// Short state for `/status`, e.g. `active (chat.log)`.
    pub fn get_status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), active) => format!(
                "{} ({})",
                if active { "active" } else { "paused" },
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }
}

fn test_file_access(path: &str) -> Result<(), Box<dyn Error>> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn entries_are_written_with_author_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.log");
        let log = TranscriptLog::new(Some(path.to_string_lossy().into_owned())).unwrap();

        log.log_entry(&ChatEntry::user("YOU", "hello")).unwrap();
        log.log_entry(&ChatEntry::assistant("AI", "line one\nline two"))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "YOU: hello\n\nAI: line one\nline two\n\n");
        assert_eq!(log.get_status_string(), "active (chat.log)");
    }

    #[test]
    fn paused_log_writes_nothing_until_resumed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.log");
        let mut log = TranscriptLog::new(Some(path.to_string_lossy().into_owned())).unwrap();

        log.toggle_logging("Logging paused").unwrap();
        assert_eq!(log.get_status_string(), "paused (chat.log)");
        log.log_entry(&ChatEntry::user("YOU", "secret")).unwrap();
        log.toggle_logging("unused").unwrap();
        log.log_entry(&ChatEntry::user("YOU", "visible")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "## Logging paused\n\nYOU: visible\n\n");
    }

    #[test]
    fn disabled_log_is_a_no_op() {
        let mut log = TranscriptLog::new(None).unwrap();
        log.log_entry(&ChatEntry::user("YOU", "hi")).unwrap();
        assert_eq!(log.get_status_string(), "disabled");
        assert!(log.toggle_logging("pause").is_err());
    }

    #[test]
    fn unwritable_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("chat.log");
        assert!(TranscriptLog::new(Some(path.to_string_lossy().into_owned())).is_err());
    }
}

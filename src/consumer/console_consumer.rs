//! Console-based artifact consumer.

use std::fs;
use std::io::{self, Write};

use tracing::warn;

use super::ArtifactConsumer;
use crate::domain::ArtifactReference;

/// Prints one line per received image.
pub struct ConsoleConsumer {
    /// Whether to include peer and timestamp details
    verbose: bool,
    presented: usize,
}

impl ConsoleConsumer {
    pub fn new() -> Self {
        Self {
            verbose: false,
            presented: 0,
        }
    }

    /// Enable or disable verbose output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of artifacts successfully presented.
    pub fn presented(&self) -> usize {
        self.presented
    }

    /// Format the line for a reference, checking the file is still readable.
    fn format_reference(&self, reference: &ArtifactReference) -> io::Result<String> {
        let metadata = fs::metadata(&reference.storage_path)?;

        let mut output = format!(
            "[PHOTO] {} | {} bytes | {}",
            reference.file_name(),
            metadata.len(),
            reference.storage_path.display()
        );

        if self.verbose {
            output.push_str(&format!(
                " | Captured: {}",
                reference.captured_at.format("%Y-%m-%d %H:%M:%S")
            ));
            if let Some(peer) = reference.peer {
                output.push_str(&format!(" | From: {}", peer));
            }
        }

        Ok(output)
    }
}

impl Default for ConsoleConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactConsumer for ConsoleConsumer {
    fn present(&mut self, reference: &ArtifactReference) {
        match self.format_reference(reference) {
            Ok(output) => {
                let mut stdout = io::stdout().lock();
                let _ = writeln!(stdout, "{}", output);
                self.presented += 1;
            }
            Err(e) => {
                warn!(
                    "Cannot open image {}: {}",
                    reference.storage_path.display(),
                    e
                );
            }
        }
    }

    fn on_start(&mut self) {
        println!("Waiting for photos...");
        println!("Press Ctrl+C to stop.\n");
    }

    fn on_stop(&mut self) {
        println!("\nStopping photo viewer ({} received).", self.presented);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn reference(path: PathBuf) -> ArtifactReference {
        ArtifactReference {
            storage_path: path,
            captured_at: Local.with_ymd_and_hms(2025, 8, 27, 14, 30, 22).unwrap(),
            size_bytes: 5,
            peer: Some("10.0.0.7:50123".parse().unwrap()),
        }
    }

    #[test]
    fn test_format_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("143022.jpg");
        fs::write(&path, b"hello").unwrap();

        let line = ConsoleConsumer::new()
            .format_reference(&reference(path))
            .unwrap();
        assert!(line.starts_with("[PHOTO] 143022.jpg | 5 bytes"));
        assert!(!line.contains("From:"));
    }

    #[test]
    fn test_format_verbose() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("143022.jpg");
        fs::write(&path, b"hello").unwrap();

        let line = ConsoleConsumer::new()
            .with_verbose(true)
            .format_reference(&reference(path))
            .unwrap();
        assert!(line.contains("Captured: 2025-08-27 14:30:22"));
        assert!(line.contains("From: 10.0.0.7:50123"));
    }

    #[test]
    fn test_missing_file_is_reported_not_counted() {
        let temp = TempDir::new().unwrap();
        let mut consumer = ConsoleConsumer::new();

        consumer.present(&reference(temp.path().join("gone.jpg")));
        assert_eq!(consumer.presented(), 0);

        let path = temp.path().join("here.jpg");
        fs::write(&path, b"hello").unwrap();
        consumer.present(&reference(path));
        assert_eq!(consumer.presented(), 1);
    }
}

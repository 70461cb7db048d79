//! Transcript folder watcher
//!
//! Polls one directory per project. Files already present when the watcher
//! starts are treated as seen. Each new `.txt`, `.md` or `.docx` file is read
//! after a settle delay and sent to the Reconciler as a meeting transcript.
//! A file is processed at most once: failures are logged, never retried, and
//! the file is left in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use riskreg_common::config::WatcherConfig;
use riskreg_common::time::millis_to_duration;
use tracing::{debug, error, info, warn};

use crate::documents;
use crate::reconciler::{ProcessResult, Reconciler};

/// Source type recorded for transcripts
pub const MEETING_SOURCE: &str = "meeting";

/// Extensions picked up from a transcript folder
pub const WATCHED_EXTENSIONS: [&str; 3] = [".txt", ".md", ".docx"];

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Shortest poll interval; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Watches one transcript folder for one project
#[derive(Debug, Clone)]
pub struct TranscriptWatcher {
    dir: PathBuf,
    project_code: String,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl TranscriptWatcher {
    pub fn new(dir: impl Into<PathBuf>, project_code: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            project_code: project_code.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new(&config.dir, &config.project)
            .with_poll_interval(millis_to_duration(config.poll_interval_ms))
            .with_settle_delay(millis_to_duration(config.settle_delay_ms))
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn project_code(&self) -> &str {
        &self.project_code
    }

    /// Poll forever; intended to run as a spawned task
    pub async fn run(self, reconciler: Arc<Reconciler>) {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), project = %self.project_code, "Transcript folder does not exist yet");
        }

        let mut seen = self.snapshot().await;
        info!(
            dir = %self.dir.display(),
            project = %self.project_code,
            existing = seen.len(),
            "Watching for new transcripts"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.poll_once(&mut seen, &reconciler).await;
        }
    }

    /// Watched files currently in the folder
    pub async fn snapshot(&self) -> HashSet<PathBuf> {
        let mut files = HashSet::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Transcript folder unreadable");
                return files;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.is_file() && is_watched(&path) {
                        files.insert(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Listing transcript folder failed");
                    break;
                }
            }
        }

        files
    }

    /// Process files that appeared since the last poll
    ///
    /// Returns the file name and result of each Reconciler call, in name order.
    pub async fn poll_once(
        &self,
        seen: &mut HashSet<PathBuf>,
        reconciler: &Reconciler,
    ) -> Vec<(String, ProcessResult)> {
        let mut new_files: Vec<PathBuf> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|p| !seen.contains(p))
            .collect();
        new_files.sort();

        let mut outcomes = Vec::new();
        for path in new_files {
            seen.insert(path.clone());
            if let Some(outcome) = self.handle_new_file(&path, reconciler).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    async fn handle_new_file(
        &self,
        path: &Path,
        reconciler: &Reconciler,
    ) -> Option<(String, ProcessResult)> {
        let file_name = path.file_name()?.to_string_lossy().to_string();
        info!(project = %self.project_code, file = %file_name, "New transcript detected");

        // Give the writer time to finish
        tokio::time::sleep(self.settle_delay).await;

        let text = match documents::read_document(path).await {
            Ok(text) => text,
            Err(e) => {
                error!(project = %self.project_code, file = %file_name, error = %e, "Reading transcript failed");
                return None;
            }
        };

        if text.trim().is_empty() {
            warn!(project = %self.project_code, file = %file_name, "Transcript is empty, skipping");
            return None;
        }

        let result = reconciler
            .process(&self.project_code, &text, MEETING_SOURCE, &file_name)
            .await;

        if result.success {
            info!(
                project = %self.project_code,
                file = %file_name,
                changes = result.changes.len(),
                "Transcript processed"
            );
        } else {
            error!(
                project = %self.project_code,
                file = %file_name,
                error = result.error.as_deref().unwrap_or(""),
                "Transcript processing failed"
            );
        }

        Some((file_name, result))
    }
}

/// Watched extension, excluding hidden files and editor lock files
fn is_watched(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.starts_with("~$") {
        return false;
    }
    WATCHED_EXTENSIONS.contains(&documents::extension_of(name).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_watched() {
        assert!(is_watched(Path::new("/t/standup.txt")));
        assert!(is_watched(Path::new("/t/Minutes.DOCX")));
        assert!(is_watched(Path::new("/t/notes.md")));
        assert!(!is_watched(Path::new("/t/scan.pdf")));
        assert!(!is_watched(Path::new("/t/~$nutes.docx")));
        assert!(!is_watched(Path::new("/t/.draft.txt")));
    }

    #[test]
    fn test_from_config() {
        let config = WatcherConfig {
            project: "HB".to_string(),
            dir: PathBuf::from("/data/HB/transcripts"),
            poll_interval_ms: 500,
            settle_delay_ms: 0,
        };
        let watcher = TranscriptWatcher::from_config(&config);
        assert_eq!(watcher.project_code(), "HB");
        assert_eq!(watcher.poll_interval, Duration::from_millis(500));
        assert_eq!(watcher.settle_delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_poll_interval_is_clamped() {
        let watcher = TranscriptWatcher::new("/nonexistent/transcripts", "HB")
            .with_poll_interval(Duration::ZERO);
        assert_eq!(watcher.poll_interval, MIN_POLL_INTERVAL);

        // Constructing the interval must not panic
        let mut interval = tokio::time::interval(watcher.poll_interval);
        interval.tick().await;
    }

    #[tokio::test]
    async fn test_snapshot_of_missing_dir_is_empty() {
        let watcher = TranscriptWatcher::new("/nonexistent/transcripts", "HB");
        assert!(watcher.snapshot().await.is_empty());
    }
}

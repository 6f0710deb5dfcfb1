use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use notify_debouncer_mini::{DebouncedEventKind, Debouncer, new_debouncer};

/// Watches a timeline document and reports when it changes on disk.
pub struct TimelineWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<PathBuf>,
    path: PathBuf,
}

impl TimelineWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx): (Sender<PathBuf>, Receiver<PathBuf>) = crossbeam_channel::unbounded();
        let target = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        let file_name = target.file_name().map(ToOwned::to_owned);

        let mut debouncer = new_debouncer(
            std::time::Duration::from_millis(100),
            move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                if let Ok(events) = res {
                    for event in events {
                        if event.kind == DebouncedEventKind::Any
                            && event.path.file_name().map(ToOwned::to_owned) == file_name
                        {
                            let _ = tx.send(event.path.clone());
                        }
                    }
                }
            },
        )?;

        // Editors often replace the file, so watch the parent directory.
        let dir = target.parent().unwrap_or(Path::new("."));
        debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::NonRecursive)?;
        log::info!("Watching {} for timeline changes", target.display());

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
            path: target,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the document changed since the last call. Collapses bursts.
    pub fn changed(&self) -> bool {
        self.receiver.try_iter().count() > 0
    }

    /// Block until the document changes or `timeout` elapses.
    pub fn wait(&self, timeout: std::time::Duration) -> bool {
        if self.receiver.recv_timeout(timeout).is_ok() {
            // Swallow the rest of the burst.
            let _ = self.changed();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error() {
        assert!(TimelineWatcher::new(Path::new("/nonexistent/timeline.json")).is_err());
    }

    #[test]
    fn starts_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.json");
        std::fs::write(&path, "{}").unwrap();
        let watcher = TimelineWatcher::new(&path).unwrap();
        assert!(watcher.path().ends_with("timeline.json"));
        assert!(!watcher.changed());
    }
}

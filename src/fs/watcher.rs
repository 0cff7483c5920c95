use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::Event;

/// Default patterns to ignore when watching the filesystem.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "target",
];

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Filesystem watcher that observes individual directories and sends
/// "re-read this directory" notifications.
///
/// Directories are added one at a time as they are first entered and are
/// never removed again for the lifetime of the process.
pub struct FsWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    watched: HashSet<PathBuf>,
}

impl FsWatcher {
    /// Create a watcher that forwards debounced changes to `event_tx`.
    ///
    /// Paths matching any of `ignore_patterns` are silently dropped.
    pub fn new(
        debounce_duration: Duration,
        ignore_patterns: Vec<String>,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> notify::Result<Self> {
        let debouncer = new_debouncer(
            debounce_duration,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    let dirs = changed_dirs(&events, &ignore_patterns);
                    if dirs.is_empty() {
                        return;
                    }
                    debug!(count = dirs.len(), "filesystem change batch");
                    let _ = event_tx.send(Event::FsChange(dirs));
                }
                Err(e) => {
                    // Watcher errors are non-fatal
                    warn!(error = %e, "watcher error");
                }
            },
        )?;

        Ok(Self {
            debouncer,
            watched: HashSet::new(),
        })
    }

    /// Begin observing `dir` (non-recursively). Repeated requests are no-ops.
    pub fn watch(&mut self, dir: &Path) -> notify::Result<()> {
        if self.watched.contains(dir) {
            return Ok(());
        }
        self.debouncer
            .watcher()
            .watch(dir, notify::RecursiveMode::NonRecursive)?;
        self.watched.insert(dir.to_path_buf());
        debug!(dir = %dir.display(), "watching directory");
        Ok(())
    }

    #[cfg(test)]
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }
}

/// Map raw event paths to the deduplicated set of directories whose listing
/// may have changed: the parent of every non-ignored event path.
pub fn changed_dirs(events: &[DebouncedEvent], ignore_patterns: &[String]) -> Vec<PathBuf> {
    let dirs: BTreeSet<PathBuf> = events
        .iter()
        .filter(|e| e.kind == DebouncedEventKind::Any)
        .map(|e| e.path.as_path())
        .filter(|p| !should_ignore(p, ignore_patterns))
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    dirs.into_iter().collect()
}

/// Check if a path should be ignored based on ignore patterns.
///
/// A path is ignored if any of its components match any ignore pattern exactly.
pub fn should_ignore(path: &Path, patterns: &[String]) -> bool {
    path.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            patterns.iter().any(|pattern| name == pattern.as_str())
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &str, kind: DebouncedEventKind) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn ignore_git_directory() {
        let patterns = vec![".git".to_string()];
        assert!(should_ignore(
            Path::new("/home/user/project/.git/HEAD"),
            &patterns
        ));
        assert!(!should_ignore(
            Path::new("/home/user/project/src/main.rs"),
            &patterns
        ));
    }

    #[test]
    fn partial_name_does_not_match() {
        let patterns = vec!["target".to_string()];
        assert!(!should_ignore(
            Path::new("/project/target2/file.txt"),
            &patterns
        ));
    }

    #[test]
    fn changes_map_to_parent_directories() {
        let events = vec![
            event("/p/src/a.rs", DebouncedEventKind::Any),
            event("/p/src/b.rs", DebouncedEventKind::Any),
            event("/p/README.md", DebouncedEventKind::Any),
        ];
        let dirs = changed_dirs(&events, &[]);
        assert_eq!(dirs, vec![PathBuf::from("/p"), PathBuf::from("/p/src")]);
    }

    #[test]
    fn ignored_and_continuous_events_are_dropped() {
        let patterns = vec!["node_modules".to_string()];
        let events = vec![
            event("/p/node_modules/x/index.js", DebouncedEventKind::Any),
            event("/p/log.txt", DebouncedEventKind::AnyContinuous),
        ];
        assert!(changed_dirs(&events, &patterns).is_empty());
    }

    #[test]
    fn watch_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut watcher = FsWatcher::new(Duration::from_millis(50), Vec::new(), tx).unwrap();
        watcher.watch(dir.path()).unwrap();
        watcher.watch(dir.path()).unwrap();
        assert_eq!(watcher.watched_count(), 1);
    }

    #[test]
    fn watch_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut watcher = FsWatcher::new(Duration::from_millis(50), Vec::new(), tx).unwrap();
        assert!(watcher.watch(&dir.path().join("missing")).is_err());
        assert_eq!(watcher.watched_count(), 0);
    }
}

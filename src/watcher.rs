//! File system watcher for watch mode

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;

const DEBOUNCE_MS: u64 = 300;

/// Watches a log directory and reports changed paths on a channel
pub struct LogWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<notify::Event>>,
    root: PathBuf,
    ignored: Vec<PathBuf>,
}

/// Events that change the set of log files
fn is_tree_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

impl LogWatcher {
    /// Start watching a log directory recursively
    pub fn watch(root: &Path) -> notify::Result<Self> {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_millis(DEBOUNCE_MS)),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            ignored: Vec::new(),
        })
    }

    /// Never report changes to `path` (e.g. the HTML file we write ourselves)
    pub fn ignore_path(mut self, path: &Path) -> Self {
        self.ignored.push(path.to_path_buf());
        if let Ok(canonical) = path.canonicalize() {
            self.ignored.push(canonical);
        }
        self
    }

    /// Whether a changed path is part of the log tree below `root`.
    ///
    /// Hidden entries (any component starting with `.` below the root) are
    /// skipped, like the directory scanner does.
    pub fn is_log_path(root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }
        !relative.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|p| p == path) {
            return false;
        }
        Self::is_log_path(&self.root, path)
    }

    /// Collect relevant paths from an event
    fn paths_from_event(&self, event: &notify::Event) -> Vec<PathBuf> {
        if !is_tree_change(&event.kind) {
            return vec![];
        }
        event
            .paths
            .iter()
            .filter(|p| self.is_relevant(p))
            .cloned()
            .collect()
    }

    /// Wait for the next batch of changes (debounced). Blocks until at least
    /// one relevant change, then drains for DEBOUNCE_MS. Returns `None` once
    /// the watcher has stopped.
    pub fn next_changes(&self) -> Option<Vec<PathBuf>> {
        loop {
            match self.next_changes_timeout(Duration::from_secs(3600)) {
                Some(changes) if changes.is_empty() => continue,
                other => return other,
            }
        }
    }

    /// Like `next_changes`, giving up with an empty batch after `timeout`
    /// without an event
    pub fn next_changes_timeout(&self, timeout: Duration) -> Option<Vec<PathBuf>> {
        let mut all = HashSet::new();

        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(event)) => all.extend(self.paths_from_event(&event)),
            Ok(Err(e)) => {
                log::warn!("watch error: {}", e);
                return Some(vec![]);
            }
            Err(RecvTimeoutError::Timeout) => return Some(vec![]),
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("watcher for {} stopped", self.root.display());
                return None;
            }
        }

        // Debounce: collect further events for a short time
        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS));
        while let Ok(ev) = self.receiver.try_recv() {
            if let Ok(event) = ev {
                all.extend(self.paths_from_event(&event));
            }
        }

        log::debug!("watch batch: {} changed paths", all.len());
        let mut changes: Vec<PathBuf> = all.into_iter().collect();
        changes.sort();
        Some(changes)
    }
}

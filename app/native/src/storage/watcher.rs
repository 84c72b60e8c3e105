//! Change notifications for the preferences file.
//!
//! `themed set` and `themed clear` run in their own process and write the
//! preferences file directly. The agent watches the file so it can pick those
//! selections up without waiting for the next appearance change.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::platform::thread::spawn_named_thread;

/// Quiet period after a write before reporting it.
/// A save is a temp-file write followed by a rename.
pub const PREFERENCES_DEBOUNCE_MS: u64 = 200;

type FsEvent = notify::Result<notify::Event>;

/// Calls back whenever the preferences file is written.
///
/// Dropping the watcher stops the OS watch and joins its thread.
pub struct PreferencesWatcher {
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl PreferencesWatcher {
    /// Starts watching `path`, calling `on_change` from the watcher thread.
    ///
    /// Returns `None` (and logs) if the file cannot be watched.
    pub fn start<F>(path: &Path, debounce: Duration, on_change: F) -> Option<Self>
    where F: Fn() + Send + 'static {
        let filename = path.file_name()?.to_os_string();
        let dir = path.parent().unwrap_or(path);

        // The directory may not exist before the first selection is saved.
        if let Err(err) = fs::create_dir_all(dir) {
            tracing::warn!(path = %dir.display(), error = %err, "failed to create preferences directory");
            return None;
        }

        let (tx, rx) = mpsc::channel::<FsEvent>();
        let mut watcher = match notify::recommended_watcher(tx) {
            Ok(watcher) => watcher,
            Err(err) => {
                tracing::warn!(error = %err, "failed to create preferences watcher");
                return None;
            }
        };

        if let Err(err) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            tracing::warn!(path = %dir.display(), error = %err, "failed to watch preferences");
            return None;
        }

        let worker = spawn_named_thread("preferences", move || run(&rx, &filename, debounce, &on_change))?;
        tracing::debug!(path = %path.display(), "watching preferences");

        Some(Self { watcher: Some(watcher), worker: Some(worker) })
    }
}

impl Drop for PreferencesWatcher {
    fn drop(&mut self) {
        // Dropping the watcher closes the channel, which ends the thread.
        drop(self.watcher.take());
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            tracing::warn!("preferences watcher thread panicked");
        }
    }
}

fn run(rx: &Receiver<FsEvent>, filename: &OsStr, debounce: Duration, on_change: &dyn Fn()) {
    while let Ok(event) = rx.recv() {
        match event {
            Ok(event) if touches(&event, filename) => {
                if !settle(rx, debounce) {
                    break;
                }
                on_change();
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "preferences watch error"),
        }
    }
}

fn touches(event: &notify::Event, filename: &OsStr) -> bool {
    event.paths.iter().any(|path| path.file_name() == Some(filename))
}

/// Swallows follow-up events for `debounce`. Returns `false` once the
/// watcher is gone.
fn settle(rx: &Receiver<FsEvent>, debounce: Duration) -> bool {
    let deadline = Instant::now() + debounce;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        match rx.recv_timeout(remaining) {
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::storage::{JsonFileStore, KeyValueStore};

    fn counting(path: &Path) -> (Arc<AtomicUsize>, PreferencesWatcher) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let watcher = PreferencesWatcher::start(path, Duration::from_millis(50), move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .expect("preferences should be watchable");

        // Give the OS watch time to register.
        std::thread::sleep(Duration::from_millis(100));
        (count, watcher)
    }

    fn wait_for(count: &AtomicUsize, at_least: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= at_least {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn store_write_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        let (count, _watcher) = counting(&path);

        JsonFileStore::open(&path).unwrap().set("darkModeBookmark", b"night").unwrap();

        assert!(wait_for(&count, 1));
    }

    #[test]
    fn other_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        let (count, _watcher) = counting(&path);

        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();
        std::thread::sleep(Duration::from_millis(300));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("themed").join("preferences.json");

        let watcher = PreferencesWatcher::start(&path, Duration::from_millis(10), || {});

        assert!(watcher.is_some());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn drop_stops_watcher() {
        let dir = TempDir::new().unwrap();
        let watcher =
            PreferencesWatcher::start(&dir.path().join("preferences.json"), Duration::from_secs(60), || {})
                .unwrap();

        let started = Instant::now();
        drop(watcher);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn default_debounce_is_reasonable() {
        const { assert!(PREFERENCES_DEBOUNCE_MS >= 50) };
        const { assert!(PREFERENCES_DEBOUNCE_MS <= 1_000) };
    }
}

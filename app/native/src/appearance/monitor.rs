//! Appearance change notifications.
//!
//! The monitor samples an [`AppearanceSource`] whenever the global
//! preferences file changes, and on a fixed poll interval as a fallback for
//! changes the file watcher misses. The callback only fires when the sampled
//! value differs from the last one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::platform::thread::spawn_named_thread;
use crate::selection::Appearance;

/// Default quiet period after a preferences write before sampling.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Default fallback poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Samples the current appearance.
pub type AppearanceSource = Arc<dyn Fn() -> Appearance + Send + Sync>;

/// Timing and watch location for an [`AppearanceMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub debounce: Duration,
    pub poll_interval: Duration,
    /// File whose writes trigger a sample. `None` polls only.
    pub watch_path: Option<PathBuf>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            watch_path: default_watch_path(),
        }
    }
}

impl MonitorSettings {
    /// Settings with the given timings and the platform watch path.
    #[must_use]
    pub fn from_millis(debounce_ms: u64, poll_interval_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            ..Self::default()
        }
    }
}

#[cfg(target_os = "macos")]
fn default_watch_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library/Preferences/.GlobalPreferences.plist"))
}

#[cfg(not(target_os = "macos"))]
const fn default_watch_path() -> Option<PathBuf> { None }

enum Signal {
    Fs(notify::Result<notify::Event>),
    Stop,
}

/// Background watcher that reports appearance changes.
///
/// Dropping the monitor stops the watcher and joins its thread.
pub struct AppearanceMonitor {
    control: Sender<Signal>,
    worker: Option<JoinHandle<()>>,
}

impl AppearanceMonitor {
    /// Starts monitoring the system appearance.
    ///
    /// `known` is the appearance the caller already acts on; a different
    /// value sampled at start is reported straight away.
    pub fn start_system<F>(settings: MonitorSettings, known: Appearance, on_change: F) -> Self
    where F: Fn(Appearance) + Send + 'static {
        Self::start(settings, Arc::new(super::current), known, on_change)
    }

    /// Starts monitoring `source`, calling `on_change` from the monitor thread.
    pub fn start<F>(settings: MonitorSettings, source: AppearanceSource, known: Appearance, on_change: F) -> Self
    where F: Fn(Appearance) + Send + 'static {
        let (tx, rx) = mpsc::channel();
        let fs_tx = tx.clone();

        let worker = spawn_named_thread("appearance", move || {
            run(&settings, &source, known, &on_change, fs_tx, &rx);
        });

        Self { control: tx, worker }
    }
}

impl Drop for AppearanceMonitor {
    fn drop(&mut self) {
        let _ = self.control.send(Signal::Stop);
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            tracing::warn!("appearance monitor thread panicked");
        }
    }
}

fn run(
    settings: &MonitorSettings,
    source: &AppearanceSource,
    known: Appearance,
    on_change: &dyn Fn(Appearance),
    fs_tx: Sender<Signal>,
    rx: &Receiver<Signal>,
) {
    // Held for the lifetime of the loop; dropping it stops the OS watch.
    let _watcher = settings.watch_path.as_deref().and_then(|path| watch(path, fs_tx));
    let filename = settings.watch_path.as_deref().and_then(Path::file_name).map(OsString::from);

    let mut last = known;
    tracing::debug!(appearance = %last, "appearance monitor started");
    // Sample immediately to catch a change made before the thread started.
    let mut next_poll = Instant::now();

    loop {
        let wait = next_poll.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Signal::Fs(Ok(event))) => {
                let relevant = filename.as_ref().is_some_and(|name| {
                    event.paths.iter().any(|p| p.file_name().is_some_and(|n| n == name))
                });
                if !relevant {
                    continue;
                }
                if settle(rx, settings.debounce) {
                    break;
                }
            }
            Ok(Signal::Fs(Err(err))) => {
                tracing::warn!(error = %err, "preferences watch error");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => {
                next_poll = Instant::now() + settings.poll_interval;
            }
        }

        let now = source();
        if now != last {
            tracing::info!(from = %last, to = %now, "appearance changed");
            last = now;
            on_change(now);
        }
    }

    tracing::debug!("appearance monitor stopped");
}

/// Swallows follow-up file events for `debounce`. Returns `true` on stop.
fn settle(rx: &Receiver<Signal>, debounce: Duration) -> bool {
    let deadline = Instant::now() + debounce;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        match rx.recv_timeout(remaining) {
            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => return true,
            Ok(Signal::Fs(_)) => {}
            Err(RecvTimeoutError::Timeout) => return false,
        }
    }
}

/// Watches the parent directory of `path`, since preference writes replace
/// the file rather than modifying it in place.
fn watch(path: &Path, tx: Sender<Signal>) -> Option<RecommendedWatcher> {
    let mut watcher = match notify::recommended_watcher(move |event| {
        let _ = tx.send(Signal::Fs(event));
    }) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(error = %err, "failed to create preferences watcher, polling only");
            return None;
        }
    };

    let watch_path = path.parent().unwrap_or(path);
    if let Err(err) = watcher.watch(watch_path, RecursiveMode::NonRecursive) {
        tracing::warn!(
            path = %watch_path.display(),
            error = %err,
            "failed to watch preferences, polling only"
        );
        return None;
    }
    Some(watcher)
}

//! Appearance-reactive applier.
//!
//! Triggers are posted to a single-slot mailbox drained by one worker
//! thread. Posting while a job is pending replaces it, so at most one job is
//! waiting and one is in flight no matter how often triggers fire. A job that
//! is already running is never cancelled; if it finishes after a newer one was
//! posted, the newer job runs next and its write wins.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use super::{BackendError, ScreenTarget, SharedBackend, set_on_screens};
use crate::access::{AccessError, AccessScope, DurableToken, SharedAccess};
use crate::platform::thread::spawn_named_thread;
use crate::selection::WallpaperSlot;

/// Observable applier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplierState {
    Idle,
    Applying,
}

/// What a job should put on the desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyTarget {
    /// A user selection; access is opened for the duration of the call.
    Selection { slot: WallpaperSlot, token: DurableToken },
    /// A system image that needs no access grant.
    Default(PathBuf),
}

/// Why a job failed.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result of one job, handed to the [`OutcomeHandler`].
#[derive(Debug)]
pub struct ApplyOutcome {
    pub generation: u64,
    pub slot: Option<WallpaperSlot>,
    pub result: Result<PathBuf, ApplyError>,
}

/// Callback invoked on the worker thread after every job.
pub type OutcomeHandler = Arc<dyn Fn(&ApplyOutcome) + Send + Sync>;

#[derive(Debug)]
struct Job {
    generation: u64,
    target: ApplyTarget,
}

struct Mailbox {
    pending: Option<Job>,
    state: ApplierState,
    next_generation: u64,
    shutdown: bool,
}

struct Shared {
    mailbox: Mutex<Mailbox>,
    wake: Condvar,
    idle: Condvar,
    backend: SharedBackend,
    access: SharedAccess,
    screens: ScreenTarget,
    on_outcome: OutcomeHandler,
}

/// Applies wallpapers on a background worker.
pub struct Applier {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Applier {
    /// Starts the worker thread.
    #[must_use]
    pub fn new(
        backend: SharedBackend,
        access: SharedAccess,
        screens: ScreenTarget,
        on_outcome: OutcomeHandler,
    ) -> Self {
        let shared = Arc::new(Shared {
            mailbox: Mutex::new(Mailbox {
                pending: None,
                state: ApplierState::Idle,
                next_generation: 1,
                shutdown: false,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            backend,
            access,
            screens,
            on_outcome,
        });

        let worker_shared = Arc::clone(&shared);
        let worker = spawn_named_thread("applier", move || run_worker(&worker_shared));

        Self { shared, worker }
    }

    /// Schedules `target`, superseding any job that has not started yet.
    ///
    /// Returns the generation assigned to the job.
    pub fn submit(&self, target: ApplyTarget) -> u64 {
        let mut mailbox = self.shared.mailbox.lock();
        let generation = mailbox.next_generation;
        mailbox.next_generation += 1;

        if let Some(superseded) = mailbox.pending.replace(Job { generation, target }) {
            tracing::debug!(superseded = superseded.generation, generation, "apply superseded");
        }
        mailbox.state = ApplierState::Applying;
        drop(mailbox);

        self.shared.wake.notify_one();
        generation
    }

    /// Schedules the wallpaper chosen for `slot`.
    pub fn apply(&self, slot: WallpaperSlot, token: DurableToken) -> u64 {
        self.submit(ApplyTarget::Selection { slot, token })
    }

    /// Schedules a system image, such as the factory default background.
    pub fn apply_default(&self, path: PathBuf) -> u64 { self.submit(ApplyTarget::Default(path)) }

    #[must_use]
    pub fn state(&self) -> ApplierState { self.shared.mailbox.lock().state }

    /// Blocks until no job is pending or running.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut mailbox = self.shared.mailbox.lock();
        while mailbox.state == ApplierState::Applying {
            if self.shared.idle.wait_until(&mut mailbox, deadline).timed_out() {
                return mailbox.state == ApplierState::Idle;
            }
        }
        true
    }
}

impl Drop for Applier {
    fn drop(&mut self) {
        self.shared.mailbox.lock().shutdown = true;
        self.shared.wake.notify_all();
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            tracing::error!("applier worker panicked");
        }
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let job = {
            let mut mailbox = shared.mailbox.lock();
            while mailbox.pending.is_none() && !mailbox.shutdown {
                shared.wake.wait(&mut mailbox);
            }
            match mailbox.pending.take() {
                Some(job) => job,
                None => break,
            }
        };

        let outcome = run_job(shared, job);
        (shared.on_outcome)(&outcome);

        let mut mailbox = shared.mailbox.lock();
        if mailbox.pending.is_none() {
            mailbox.state = ApplierState::Idle;
            shared.idle.notify_all();
        }
    }

    let mut mailbox = shared.mailbox.lock();
    mailbox.state = ApplierState::Idle;
    shared.idle.notify_all();
}

fn run_job(shared: &Shared, job: Job) -> ApplyOutcome {
    match job.target {
        ApplyTarget::Selection { slot, token } => {
            let result = apply_selection(shared, &token);
            match &result {
                Ok(path) => tracing::info!(%slot, path = %path.display(), "wallpaper applied"),
                Err(err) => tracing::warn!(%slot, error = %err, "failed to apply wallpaper"),
            }
            ApplyOutcome { generation: job.generation, slot: Some(slot), result }
        }
        ApplyTarget::Default(path) => {
            let result = set_on_screens(shared.backend.as_ref(), &path, shared.screens)
                .map(|()| path)
                .map_err(ApplyError::from);
            if let Err(err) = &result {
                tracing::warn!(error = %err, "failed to restore default wallpaper");
            }
            ApplyOutcome { generation: job.generation, slot: None, result }
        }
    }
}

/// Opens access right before the set call; the scope closes when it drops.
fn apply_selection(shared: &Shared, token: &DurableToken) -> Result<PathBuf, ApplyError> {
    let scope = AccessScope::open(&shared.access, token)?;
    set_on_screens(shared.backend.as_ref(), scope.path(), shared.screens)?;
    Ok(scope.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::access::{AccessProvider, PassthroughProvider};
    use crate::wallpaper::{DesktopBackend, Screen};

    #[derive(Default)]
    struct RecordingBackend {
        set: Mutex<Vec<PathBuf>>,
        delay: Duration,
    }

    impl DesktopBackend for RecordingBackend {
        fn screens(&self) -> Result<Vec<Screen>, BackendError> {
            Ok(vec![Screen { index: 0, name: "Main".to_string() }])
        }

        fn set_for_screen(&self, path: &Path, _screen: &Screen) -> Result<(), BackendError> {
            std::thread::sleep(self.delay);
            self.set.lock().push(path.to_path_buf());
            Ok(())
        }

        fn default_image(&self) -> Option<PathBuf> { None }
    }

    fn setup(delay: Duration) -> (TempDir, Arc<RecordingBackend>, Arc<PassthroughProvider>) {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(RecordingBackend { set: Mutex::new(Vec::new()), delay });
        (dir, backend, Arc::new(PassthroughProvider::new()))
    }

    fn image(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"png").unwrap();
        path.canonicalize().unwrap()
    }

    #[test]
    fn applies_selection_and_releases_access() {
        let (dir, backend, access) = setup(Duration::ZERO);
        let path = image(&dir, "night.png");
        let token = access.mint(&path).unwrap();
        let outcomes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&outcomes);

        let applier = Applier::new(
            backend.clone(),
            access.clone(),
            ScreenTarget::All,
            Arc::new(move |outcome: &ApplyOutcome| {
                assert!(outcome.result.is_ok());
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        applier.apply(WallpaperSlot::Dark, token);
        assert!(applier.wait_idle(Duration::from_secs(5)));

        assert_eq!(*backend.set.lock(), vec![path]);
        assert_eq!(outcomes.load(Ordering::SeqCst), 1);
        assert_eq!(access.open_scopes(), 0);
        assert_eq!(applier.state(), ApplierState::Idle);
    }

    #[test]
    fn failure_is_reported_and_access_released() {
        let (dir, backend, access) = setup(Duration::ZERO);
        let path = image(&dir, "gone.png");
        let token = access.mint(&path).unwrap();
        fs::remove_file(&path).unwrap();
        let failed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failed);

        let applier = Applier::new(
            backend.clone(),
            access.clone(),
            ScreenTarget::All,
            Arc::new(move |outcome: &ApplyOutcome| {
                if outcome.result.is_err() {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        applier.apply(WallpaperSlot::Light, token);
        assert!(applier.wait_idle(Duration::from_secs(5)));

        assert_eq!(failed.load(Ordering::SeqCst), 1);
        assert!(backend.set.lock().is_empty());
        assert_eq!(access.open_scopes(), 0);
    }

    #[test]
    fn burst_of_triggers_ends_on_latest() {
        let (dir, backend, access) = setup(Duration::from_millis(20));
        let first = image(&dir, "first.png");
        let last = image(&dir, "last.png");
        let first_token = access.mint(&first).unwrap();
        let last_token = access.mint(&last).unwrap();

        let applier =
            Applier::new(backend.clone(), access.clone(), ScreenTarget::All, Arc::new(|_: &ApplyOutcome| {}));

        for _ in 0..50 {
            applier.apply(WallpaperSlot::Light, first_token.clone());
        }
        let latest = applier.apply(WallpaperSlot::Dark, last_token);
        assert!(latest > 50);
        assert!(applier.wait_idle(Duration::from_secs(5)));

        let set = backend.set.lock();
        assert_eq!(set.last(), Some(&last));
        // One in flight plus one pending at most; the rest were superseded.
        assert!(set.len() <= 3, "expected superseded jobs to be skipped, got {}", set.len());
    }

    #[test]
    fn default_image_needs_no_token() {
        let (dir, backend, access) = setup(Duration::ZERO);
        let factory = image(&dir, "factory.heic");

        let applier =
            Applier::new(backend.clone(), access.clone(), ScreenTarget::All, Arc::new(|_: &ApplyOutcome| {}));
        applier.apply_default(factory.clone());
        assert!(applier.wait_idle(Duration::from_secs(5)));

        assert_eq!(*backend.set.lock(), vec![factory]);
    }

    #[test]
    fn idle_applier_waits_immediately() {
        let (_dir, backend, access) = setup(Duration::ZERO);
        let applier = Applier::new(backend, access, ScreenTarget::All, Arc::new(|_: &ApplyOutcome| {}));
        assert!(applier.wait_idle(Duration::from_millis(10)));
    }
}

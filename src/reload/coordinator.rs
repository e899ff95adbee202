//! Reload Coordinator
//!
//! Serializes reload requests coming from every watch root.
//!
//! ```text
//! root A ──┐
//! root B ──┼──> request_reload ──> [build] ──> ReloadTarget::restart
//! root C ──┘        (single-flight, coalescing)
//! ```
//!
//! At most one reload runs at a time. Requests that arrive while a reload is
//! in flight collapse into one pending follow-up, which the thread owning the
//! in-flight reload runs once the current one completes.
//!
//! Watch callbacks use the split form: [`ReloadCoordinator::admit`] claims the
//! flight on the dispatcher thread, [`ReloadCoordinator::run`] executes it on a
//! worker, so the root keeps delivering (and coalescing) while a build runs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use super::classify::Classification;
use crate::build::BuildTool;
use crate::supervisor::SupervisorError;
use crate::{debug, log, logger};

/// Something that can be restarted by the coordinator.
pub trait ReloadTarget: Send + Sync {
    fn restart(&self) -> Result<(), SupervisorError>;
}

/// What happened to a single `request_reload` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Classification was `Ignore`.
    Ignored,
    /// This call ran the reload (and any follow-up) to completion.
    Completed,
    /// A reload was in flight; the request was merged into the follow-up.
    Coalesced,
    /// The coordinator is closed (shutdown requested).
    Rejected,
}

#[derive(Debug, Clone)]
struct Request {
    classification: Classification,
    path: PathBuf,
}

/// Ownership of the in-flight reload, handed out by [`ReloadCoordinator::admit`].
#[must_use = "an admitted reload must be passed to `run`"]
#[derive(Debug)]
pub struct ReloadTicket(Request);

/// Clears the flight if a build or restart unwinds, so `close()` cannot hang.
struct FlightGuard<'a>(&'a ReloadCoordinator);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut flight = self.0.flight.lock();
            flight.in_flight = false;
            flight.pending = None;
            self.0.idle.notify_all();
        }
    }
}

#[derive(Debug, Default)]
struct Flight {
    in_flight: bool,
    closed: bool,
    pending: Option<Request>,
}

/// Single-flight reload coordinator.
pub struct ReloadCoordinator {
    flight: Mutex<Flight>,
    idle: Condvar,
    build: Arc<dyn BuildTool>,
    target: Weak<dyn ReloadTarget>,
}

impl ReloadCoordinator {
    pub fn new(build: Arc<dyn BuildTool>, target: Weak<dyn ReloadTarget>) -> Self {
        Self {
            flight: Mutex::new(Flight::default()),
            idle: Condvar::new(),
            build,
            target,
        }
    }

    /// Request a reload for a change at `path`.
    ///
    /// Blocks the calling thread while it owns the in-flight reload,
    /// including a synchronous build for `RecompileThenRestart`.
    pub fn request_reload(&self, classification: Classification, path: &Path) -> ReloadOutcome {
        match self.admit(classification, path) {
            Ok(ticket) => self.run(ticket),
            Err(outcome) => outcome,
        }
    }

    /// Claim the flight for a change at `path` without running it.
    ///
    /// `Ok` makes the caller the owner; it must hand the ticket to [`run`].
    /// `Err` carries the final outcome (ignored, merged or rejected).
    ///
    /// [`run`]: ReloadCoordinator::run
    pub fn admit(
        &self,
        classification: Classification,
        path: &Path,
    ) -> Result<ReloadTicket, ReloadOutcome> {
        if classification == Classification::Ignore {
            debug!("reload"; "ignoring change: {}", path.display());
            return Err(ReloadOutcome::Ignored);
        }

        let request = Request {
            classification,
            path: path.to_path_buf(),
        };

        let mut flight = self.flight.lock();
        if flight.closed {
            debug!("reload"; "shutting down, dropping change: {}", path.display());
            return Err(ReloadOutcome::Rejected);
        }
        if flight.in_flight {
            let merged = match flight.pending.take() {
                Some(prev) => Request {
                    classification: prev.classification.max(classification),
                    path: request.path,
                },
                None => request,
            };
            debug!("reload"; "coalesced {} ({})", merged.path.display(), merged.classification.label());
            flight.pending = Some(merged);
            return Err(ReloadOutcome::Coalesced);
        }
        flight.in_flight = true;
        Ok(ReloadTicket(request))
    }

    /// Run an admitted reload, then the follow-up merged while it ran.
    pub fn run(&self, ticket: ReloadTicket) -> ReloadOutcome {
        let _guard = FlightGuard(self);
        let mut current = ticket.0;

        loop {
            self.execute(&current);

            let mut flight = self.flight.lock();
            match flight.pending.take() {
                Some(next) if !flight.closed => current = next,
                _ => {
                    flight.pending = None;
                    flight.in_flight = false;
                    self.idle.notify_all();
                    return ReloadOutcome::Completed;
                }
            }
        }
    }

    fn execute(&self, request: &Request) {
        let path = request.path.display();

        if request.classification == Classification::RecompileThenRestart {
            log!("build"; "compiling after change: {}", path);
            if let Err(e) = self.build.build() {
                logger::status_error(&format!("build failed: {path}"), &e.to_string());
                return;
            }
            debug!("build"; "compilation done");
        }

        let Some(target) = self.target.upgrade() else {
            return;
        };

        debug!("reload"; "restarting application on file change: {}", path);
        let started = Instant::now();
        match target.restart() {
            Ok(()) => logger::status_success(&format!(
                "restarted in {}ms ({})",
                started.elapsed().as_millis(),
                path
            )),
            Err(e) => logger::status_error(&format!("restart failed: {path}"), &e.to_string()),
        }
    }

    /// Reject new reloads and wait for the in-flight one to finish.
    pub fn close(&self) {
        let mut flight = self.flight.lock();
        flight.closed = true;
        flight.pending = None;
        while flight.in_flight {
            self.idle.wait(&mut flight);
        }
    }

    /// Accept reloads again (used when the supervisor is started anew).
    pub fn open(&self) {
        self.flight.lock().closed = false;
    }

    #[cfg(test)]
    pub fn is_in_flight(&self) -> bool {
        self.flight.lock().in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    /// Restart target that blocks its first restart until released.
    struct GatedTarget {
        restarts: AtomicUsize,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl GatedTarget {
        fn new() -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            let target = Arc::new(Self {
                restarts: AtomicUsize::new(0),
                entered: Mutex::new(Some(entered_tx)),
                gate: Mutex::new(Some(release_rx)),
            });
            (target, entered_rx, release_tx)
        }

        fn count(&self) -> usize {
            self.restarts.load(Ordering::SeqCst)
        }
    }

    impl ReloadTarget for GatedTarget {
        fn restart(&self) -> Result<(), SupervisorError> {
            self.restarts.fetch_add(1, Ordering::SeqCst);
            if let Some(tx) = self.entered.lock().take() {
                let _ = tx.send(());
            }
            let gate = self.gate.lock().take();
            if let Some(rx) = gate {
                let _ = rx.recv_timeout(Duration::from_secs(5));
            }
            Ok(())
        }
    }

    struct CountingBuild {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingBuild {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl BuildTool for CountingBuild {
        fn build(&self) -> Result<(), BuildError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(BuildError::Failed {
                    command: "gradle classes".into(),
                    status: "exit status: 1".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn coordinator(
        build: Arc<CountingBuild>,
        target: &Arc<GatedTarget>,
    ) -> Arc<ReloadCoordinator> {
        let target: Arc<dyn ReloadTarget> = target.clone();
        Arc::new(ReloadCoordinator::new(build, Arc::downgrade(&target)))
    }

    #[test]
    fn test_ignore_does_not_restart() {
        let (target, _entered, _release) = GatedTarget::new();
        let build = CountingBuild::new(false);
        let coord = coordinator(build.clone(), &target);

        let outcome = coord.request_reload(Classification::Ignore, Path::new("notes.txt"));

        assert_eq!(outcome, ReloadOutcome::Ignored);
        assert_eq!(target.count(), 0);
        assert_eq!(build.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_restart_only_skips_build() {
        let (target, _entered, release) = GatedTarget::new();
        release.send(()).unwrap();
        let build = CountingBuild::new(false);
        let coord = coordinator(build.clone(), &target);

        let outcome = coord.request_reload(Classification::RestartOnly, Path::new("app.conf"));

        assert_eq!(outcome, ReloadOutcome::Completed);
        assert_eq!(target.count(), 1);
        assert_eq!(build.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_build_failure_skips_restart() {
        let (target, _entered, _release) = GatedTarget::new();
        let build = CountingBuild::new(true);
        let coord = coordinator(build.clone(), &target);

        let outcome =
            coord.request_reload(Classification::RecompileThenRestart, Path::new("App.java"));

        assert_eq!(outcome, ReloadOutcome::Completed);
        assert_eq!(build.calls.load(Ordering::SeqCst), 1);
        assert_eq!(target.count(), 0);
        assert!(!coord.is_in_flight());
    }

    #[test]
    fn test_burst_during_flight_coalesces_into_one() {
        let (target, entered, release) = GatedTarget::new();
        let build = CountingBuild::new(false);
        let coord = coordinator(build.clone(), &target);

        let owner = {
            let coord = coord.clone();
            thread::spawn(move || coord.request_reload(Classification::RestartOnly, Path::new("a.conf")))
        };
        entered.recv_timeout(Duration::from_secs(5)).unwrap();

        for i in 0..10 {
            let path = PathBuf::from(format!("file{i}.conf"));
            assert_eq!(
                coord.request_reload(Classification::RestartOnly, &path),
                ReloadOutcome::Coalesced
            );
        }

        release.send(()).unwrap();
        assert_eq!(owner.join().unwrap(), ReloadOutcome::Completed);
        assert_eq!(target.count(), 2);
        assert_eq!(build.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_recompile_not_superseded_by_later_restart() {
        let (target, entered, release) = GatedTarget::new();
        let build = CountingBuild::new(false);
        let coord = coordinator(build.clone(), &target);

        let owner = {
            let coord = coord.clone();
            thread::spawn(move || coord.request_reload(Classification::RestartOnly, Path::new("a.conf")))
        };
        entered.recv_timeout(Duration::from_secs(5)).unwrap();

        coord.request_reload(Classification::RecompileThenRestart, Path::new("App.java"));
        coord.request_reload(Classification::RestartOnly, Path::new("b.conf"));

        release.send(()).unwrap();
        owner.join().unwrap();

        // The follow-up kept the recompile.
        assert_eq!(build.calls.load(Ordering::SeqCst), 1);
        assert_eq!(target.count(), 2);
    }

    struct PanickingTarget;

    impl ReloadTarget for PanickingTarget {
        fn restart(&self) -> Result<(), SupervisorError> {
            panic!("restart blew up");
        }
    }

    #[test]
    fn test_panicking_restart_releases_flight() {
        let target: Arc<dyn ReloadTarget> = Arc::new(PanickingTarget);
        let coord = Arc::new(ReloadCoordinator::new(
            CountingBuild::new(false),
            Arc::downgrade(&target),
        ));

        let worker = {
            let coord = coord.clone();
            thread::spawn(move || coord.request_reload(Classification::RestartOnly, Path::new("a.conf")))
        };
        assert!(worker.join().is_err());
        assert!(!coord.is_in_flight());

        let (done_tx, done_rx) = mpsc::channel();
        let closer = {
            let coord = coord.clone();
            thread::spawn(move || {
                coord.close();
                let _ = done_tx.send(());
            })
        };
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        closer.join().unwrap();
    }

    #[test]
    fn test_admit_claims_flight_until_run() {
        let (target, _entered, release) = GatedTarget::new();
        release.send(()).unwrap();
        let coord = coordinator(CountingBuild::new(false), &target);

        let ticket = coord
            .admit(Classification::RestartOnly, Path::new("a.conf"))
            .unwrap();
        assert!(coord.is_in_flight());
        for name in ["b.conf", "c.conf", "d.conf"] {
            assert_eq!(
                coord.admit(Classification::RestartOnly, Path::new(name)).unwrap_err(),
                ReloadOutcome::Coalesced
            );
        }
        assert_eq!(
            coord.admit(Classification::Ignore, Path::new("notes.txt")).unwrap_err(),
            ReloadOutcome::Ignored
        );

        assert_eq!(coord.run(ticket), ReloadOutcome::Completed);
        // one reload plus one merged follow-up
        assert_eq!(target.count(), 2);
        assert!(!coord.is_in_flight());
    }

    #[test]
    fn test_close_waits_and_rejects() {
        let (target, entered, release) = GatedTarget::new();
        let build = CountingBuild::new(false);
        let coord = coordinator(build, &target);

        let owner = {
            let coord = coord.clone();
            thread::spawn(move || coord.request_reload(Classification::RestartOnly, Path::new("a.conf")))
        };
        entered.recv_timeout(Duration::from_secs(5)).unwrap();
        coord.request_reload(Classification::RestartOnly, Path::new("b.conf"));

        let closer = {
            let coord = coord.clone();
            thread::spawn(move || coord.close())
        };
        while coord.request_reload(Classification::RestartOnly, Path::new("poll.conf"))
            != ReloadOutcome::Rejected
        {
            thread::sleep(Duration::from_millis(5));
        }
        release.send(()).unwrap();
        closer.join().unwrap();
        owner.join().unwrap();

        // Pending follow-up was dropped by close().
        assert_eq!(target.count(), 1);
        assert_eq!(
            coord.request_reload(Classification::RestartOnly, Path::new("c.conf")),
            ReloadOutcome::Rejected
        );

        coord.open();
        assert_eq!(
            coord.request_reload(Classification::RestartOnly, Path::new("d.conf")),
            ReloadOutcome::Completed
        );
    }
}

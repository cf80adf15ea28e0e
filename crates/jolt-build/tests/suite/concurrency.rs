use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use jolt_build::{
    BuildContext, BuildError, BuildServer, BuilderError, ConcurrentBuildPolicy, IncrementalBuilder,
};
use jolt_core::{BuildParameters, NullMessageHandler};
use jolt_test_utils::ProjectFixture;

use super::support::ALL_MODULES;

/// Tracks how many builds run at the same time.
#[derive(Default)]
struct OverlapBuilder {
    active: AtomicUsize,
    max_active: AtomicUsize,
    runs: AtomicUsize,
}

impl IncrementalBuilder for OverlapBuilder {
    fn build(&self, _context: &mut BuildContext<'_>) -> Result<(), BuilderError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn same_project_builds_never_overlap() {
    const THREADS: usize = 4;

    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let builder = Arc::new(OverlapBuilder::default());
    let server = Arc::new(BuildServer::new(
        fixture.temp_dir().join("cache"),
        builder.clone(),
    ));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let server = Arc::clone(&server);
            let path = fixture.path().to_path_buf();
            thread::spawn(move || {
                server
                    .start_build(&path, ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(builder.runs.load(Ordering::SeqCst), THREADS);
    assert_eq!(builder.max_active.load(Ordering::SeqCst), 1);
}

/// Blocks inside `build` until released.
struct GateBuilder {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl IncrementalBuilder for GateBuilder {
    fn build(&self, _context: &mut BuildContext<'_>) -> Result<(), BuilderError> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10))
            .map_err(|_| BuilderError::failed("gate was never released"))
    }
}

#[test]
fn reject_policy_fails_concurrent_requests_fast() {
    let fixture = ProjectFixture::directory_based("app", &["core"]);
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let builder = Arc::new(GateBuilder {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let server = Arc::new(
        BuildServer::new(fixture.temp_dir().join("cache"), builder)
            .with_policy(ConcurrentBuildPolicy::Reject),
    );

    let running = {
        let server = Arc::clone(&server);
        let path = fixture.path().to_path_buf();
        thread::spawn(move || {
            server.start_build(&path, ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        })
    };
    entered_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(server.is_building(fixture.path()));

    let err = server
        .start_build(fixture.path(), ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
        .unwrap_err();
    assert!(matches!(err, BuildError::BuildInProgress { .. }), "unexpected error: {err:?}");

    release_tx.send(()).unwrap();
    running.join().unwrap().unwrap();
    assert!(!server.is_building(fixture.path()));
}

/// Succeeds only if `expected` builds are inside `build` at the same time.
struct RendezvousBuilder {
    expected: usize,
    inside: Mutex<usize>,
    changed: Condvar,
}

impl IncrementalBuilder for RendezvousBuilder {
    fn build(&self, _context: &mut BuildContext<'_>) -> Result<(), BuilderError> {
        let mut inside = self.inside.lock().unwrap();
        *inside += 1;
        self.changed.notify_all();
        let (inside, timeout) = self
            .changed
            .wait_timeout_while(inside, Duration::from_secs(10), |inside| {
                *inside < self.expected
            })
            .unwrap();
        drop(inside);
        if timeout.timed_out() {
            return Err(BuilderError::failed("builds for different projects were serialized"));
        }
        Ok(())
    }
}

#[test]
fn different_projects_build_concurrently() {
    let first = ProjectFixture::directory_based("first", &["core"]);
    let second = ProjectFixture::directory_based("second", &["core"]);
    let builder = Arc::new(RendezvousBuilder {
        expected: 2,
        inside: Mutex::new(0),
        changed: Condvar::new(),
    });
    let server = Arc::new(
        BuildServer::new(first.temp_dir().join("cache"), builder)
            .with_policy(ConcurrentBuildPolicy::Reject),
    );

    let handles: Vec<_> = [first.path(), second.path()]
        .into_iter()
        .map(|path| {
            let server = Arc::clone(&server);
            let path = path.to_path_buf();
            thread::spawn(move || {
                server.start_build(&path, ALL_MODULES, &BuildParameters::make(), &NullMessageHandler)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
}

//! Tests for tokio spawner utilities

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use prometheus_launch_gate::core::{
    BoundedLauncher, ConfigurationError, LauncherState, Rejection, Spawn, DEFAULT_CAPACITY,
};
use prometheus_launch_gate::runtime::tokio_spawner::TokioSpawner;
use prometheus_launch_gate::runtime::DEFAULT_UNIT_LIMIT;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner
        .spawn(Box::new(move || {
            tx.send(123).unwrap();
        }))
        .expect("spawn");

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_launcher_on_tokio_blocking_pool() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());
    let mut launcher = BoundedLauncher::with_spawner("tokio", spawner);
    launcher.configure(1).unwrap();
    launcher.start().unwrap();
    let launcher = Arc::new(launcher);

    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    assert!(launcher.launch(move || drop(release_rx.recv())));
    assert!(!launcher.launch(|| {}));

    let waiter = {
        let launcher = Arc::clone(&launcher);
        tokio::spawn(async move { launcher.block_for_availability_async().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    drop(release_tx);
    let hint = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter timed out")
        .expect("waiter join");
    assert!(hint > 0);

    launcher.shutdown_async(true).await;
    assert_eq!(launcher.state(), LauncherState::Drained);
    assert_eq!(launcher.block_for_availability_async().await, 0);
}

#[test]
fn test_owned_runtime_spawner() {
    let spawner = TokioSpawner::with_worker_threads(1, 4).expect("runtime");
    assert_eq!(spawner.unit_limit(), Some(4));

    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(Box::new(move || tx.send("done").unwrap())).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "done");
}

#[test]
fn test_default_worker_threads_spawner() {
    let spawner = TokioSpawner::with_default_worker_threads(8).expect("runtime");
    let mut launcher = BoundedLauncher::with_spawner("per-cpu", spawner);
    launcher.configure(8).unwrap();
    launcher.start().unwrap();

    let (tx, rx) = crossbeam_channel::bounded(1);
    assert!(launcher.launch(move || tx.send(7).unwrap()));
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    launcher.shutdown(true);
}

#[test]
fn test_every_admitted_task_runs_at_once() {
    const CAPACITY: usize = 4;

    let spawner = TokioSpawner::with_worker_threads(1, CAPACITY).expect("runtime");
    let mut launcher = BoundedLauncher::with_spawner("tokio-units", spawner);
    launcher.configure(CAPACITY).unwrap();
    launcher.start().unwrap();

    // Only passable if all admitted tasks hold a blocking thread together.
    let barrier = Arc::new(Barrier::new(CAPACITY));
    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    for _ in 0..CAPACITY {
        let barrier = Arc::clone(&barrier);
        let done_tx = done_tx.clone();
        assert!(launcher.launch(move || {
            barrier.wait();
            done_tx.send(()).unwrap();
        }));
    }

    for _ in 0..CAPACITY {
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("admitted task never got its own unit");
    }
    launcher.shutdown(true);
    assert_eq!(launcher.stats().completed, CAPACITY as u64);
}

#[test]
fn test_start_refuses_capacity_above_blocking_pool() {
    let spawner = TokioSpawner::with_worker_threads(1, 2).expect("runtime");
    let mut launcher = BoundedLauncher::with_spawner("small-pool", spawner);
    launcher.configure(4).unwrap();
    assert_eq!(
        launcher.start(),
        Err(ConfigurationError::UnitLimitExceeded {
            capacity: 4,
            limit: 2
        })
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let borrowed = TokioSpawner::new(runtime.handle().clone());
    assert_eq!(borrowed.unit_limit(), Some(DEFAULT_UNIT_LIMIT));

    let mut launcher = BoundedLauncher::with_spawner("borrowed", borrowed.clone());
    assert_eq!(
        launcher.start(),
        Err(ConfigurationError::UnitLimitExceeded {
            capacity: DEFAULT_CAPACITY,
            limit: DEFAULT_UNIT_LIMIT
        })
    );

    let mut launcher =
        BoundedLauncher::with_spawner("declared", borrowed.with_unit_limit(DEFAULT_CAPACITY));
    launcher.start().unwrap();
    assert_eq!(launcher.capacity(), DEFAULT_CAPACITY);
}

#[test]
fn test_shut_down_runtime_rejects_launch() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let handle = runtime.handle().clone();
    drop(runtime);

    let spawner = TokioSpawner::new(handle);
    assert!(spawner.spawn(Box::new(|| {})).is_err());

    let mut launcher = BoundedLauncher::with_spawner("dead-runtime", spawner);
    launcher.configure(2).unwrap();
    launcher.start().unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let rejected = launcher
        .try_launch(move || flag.store(true, Ordering::SeqCst))
        .unwrap_err();
    assert_eq!(rejected.reason(), Rejection::SpawnFailed);
    assert!(!launcher.launch(|| {}));
    assert!(!ran.load(Ordering::SeqCst));

    let stats = launcher.stats();
    assert_eq!(stats.available, 2);
    assert_eq!(stats.launched, 0);
    assert_eq!(stats.rejected, 2);
}

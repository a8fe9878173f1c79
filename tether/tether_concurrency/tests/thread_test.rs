//! Integration tests for thread spawning and joining.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use tether_concurrency::thread::{self, SpawnMode, Spawned, ThreadManager};

fn wait_for_idle(manager: &ThreadManager) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while manager.stats().live > 0 {
        assert!(Instant::now() < deadline, "threads did not finish");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_join_reclaims_every_thread() {
    let manager = ThreadManager::new();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..200 {
        let counter = Arc::clone(&counter);
        let handle = manager
            .spawn_joinable(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        handle.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 200);
    let stats = manager.stats();
    assert_eq!(stats.spawned, 200);
    assert_eq!(stats.joined, 200);
    assert_eq!(stats.live, 0);
}

#[test]
fn test_join_waits_for_work() {
    let manager = ThreadManager::new();
    let done = Arc::new(AtomicUsize::new(0));
    let done_clone = Arc::clone(&done);

    let handle = manager
        .spawn_joinable(move || {
            thread::sleep(Duration::from_millis(30));
            done_clone.store(1, Ordering::SeqCst);
        })
        .unwrap();

    handle.join().unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[test]
fn test_detached_threads_reclaim_themselves() {
    let manager = ThreadManager::new();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..50 {
        let counter = Arc::clone(&counter);
        let id = manager
            .spawn_detached(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(id > 0);
    }

    wait_for_idle(&manager);
    assert_eq!(counter.load(Ordering::SeqCst), 50);

    let stats = manager.stats();
    assert_eq!(stats.detached, 50);
    assert_eq!(stats.joined, 0);
}

#[test]
fn test_unified_spawn_returns_matching_variant() {
    let manager = ThreadManager::new();

    let detached = manager.spawn(SpawnMode::Detached, || {}).unwrap();
    assert!(matches!(detached, Spawned::Detached { .. }));

    let joinable = manager.spawn(SpawnMode::Joinable, || {}).unwrap();
    assert!(joinable.is_joinable());
    assert_ne!(joinable.id(), detached.id());

    joinable.into_handle().unwrap().join().unwrap();
    wait_for_idle(&manager);
}

#[test]
fn test_spawned_work_runs_concurrently() {
    let manager = ThreadManager::new();
    let (ping_tx, ping_rx) = bounded::<u32>(0);
    let (pong_tx, pong_rx) = bounded::<u32>(0);

    // Rendezvous channels only make progress if both sides run at once.
    let handle = manager
        .spawn_joinable(move || {
            for _ in 0..10 {
                let value = ping_rx.recv().unwrap();
                pong_tx.send(value + 1).unwrap();
            }
        })
        .unwrap();

    for i in 0..10 {
        ping_tx.send(i).unwrap();
        assert_eq!(pong_rx.recv().unwrap(), i + 1);
    }
    handle.join().unwrap();
}

#[test]
fn test_dropped_handle_detaches() {
    let manager = ThreadManager::new();
    let (done_tx, done_rx) = bounded::<()>(1);

    let handle = manager
        .spawn_joinable(move || done_tx.send(()).unwrap())
        .unwrap();
    drop(handle);

    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    wait_for_idle(&manager);
    assert_eq!(manager.stats().joined, 0);
}

#[test]
fn test_panicking_work_does_not_poison_manager() {
    let manager = ThreadManager::new();

    let failed = manager.spawn_joinable(|| panic!("boom")).unwrap();
    assert!(failed.join().is_err());

    let healthy = manager.spawn_joinable(|| {}).unwrap();
    healthy.join().unwrap();

    let stats = manager.stats();
    assert_eq!(stats.panicked, 1);
    assert_eq!(stats.joined, 2);
}

#[test]
fn test_sleep_lower_bound() {
    for millis in [1u64, 15, 40] {
        let requested = Duration::from_millis(millis);
        let start = Instant::now();
        thread::sleep(requested);
        assert!(start.elapsed() >= requested);
    }
}

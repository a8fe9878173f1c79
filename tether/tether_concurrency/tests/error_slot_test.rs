//! Integration tests for per-thread error isolation.

use crossbeam_channel::bounded;
use tether_concurrency::error_slot::{clear_error, get_error, has_error, set_error, NO_ERROR};
use tether_concurrency::ThreadManager;

#[test]
fn test_threads_never_see_each_others_codes() {
    let manager = ThreadManager::new();
    let (a_set_tx, a_set_rx) = bounded::<()>(0);
    let (b_done_tx, b_done_rx) = bounded::<()>(0);

    let a = manager
        .spawn_joinable(move || {
            set_error(5);
            a_set_tx.send(()).unwrap();
            b_done_rx.recv().unwrap();

            // B wrote its own slot in the meantime.
            assert!(has_error());
            assert_eq!(get_error(), 5);
            assert_eq!(get_error(), NO_ERROR);
        })
        .unwrap();

    let b = manager
        .spawn_joinable(move || {
            a_set_rx.recv().unwrap();
            assert!(!has_error());
            assert_eq!(get_error(), NO_ERROR);

            set_error(7);
            b_done_tx.send(()).unwrap();
            assert_eq!(get_error(), 7);
        })
        .unwrap();

    a.join().unwrap();
    b.join().unwrap();
}

#[test]
fn test_many_threads_keep_their_own_codes() {
    let manager = ThreadManager::new();

    let handles: Vec<_> = (1..=16i64)
        .map(|code| {
            manager
                .spawn_joinable(move || {
                    clear_error();
                    for _ in 0..1000 {
                        set_error(code);
                        std::thread::yield_now();
                        assert_eq!(get_error(), code);
                    }
                })
                .unwrap()
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_reused_thread_slots_start_clean() {
    let manager = ThreadManager::new();

    // Exiting threads leave codes behind; later threads must not inherit them.
    for round in 0..20i64 {
        let handle = manager
            .spawn_joinable(move || {
                assert_eq!(get_error(), NO_ERROR, "round {}", round);
                set_error(round + 100);
            })
            .unwrap();
        handle.join().unwrap();
    }
}

#[test]
fn test_spawning_thread_state_is_not_inherited() {
    let manager = ThreadManager::new();
    set_error(-1);

    let handle = manager
        .spawn_joinable(|| assert!(!has_error()))
        .unwrap();
    handle.join().unwrap();

    assert_eq!(get_error(), -1);
}

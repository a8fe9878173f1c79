//! OS thread spawning and joining.
//!
//! This module provides:
//!
//! - A manager that starts units of work on named OS threads
//! - Detached and joinable spawn modes behind a single entry point
//! - Owning join handles that can be consumed exactly once
//! - A voluntary sleep for the calling thread

pub mod handle;
pub mod manager;

use std::time::Duration;

// Re-export key types from handle
pub use handle::ThreadHandle;

// Re-export key types from manager
pub use manager::{SpawnMode, Spawned, ThreadManager, ThreadStats};

/// Suspend the calling thread for at least `duration`.
///
/// The thread may sleep longer than requested; a zero duration returns
/// immediately.
pub fn sleep(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

//! Thread spawning, joining, and sleeping for compiled code.
//!
//! Units of work are zero-argument `extern "C"` functions. A detached spawn
//! returns a diagnostic token; a joinable spawn returns a table handle that
//! must be passed to [`tether_thread_join`] exactly once.

use log::{debug, trace, warn};
use std::fmt;
use std::time::Duration;
use tether_concurrency::error_slot;
use tether_concurrency::thread;
use tether_concurrency::ThreadHandle;
use tether_core::{Handle, InvalidJoinPolicy, RuntimeConfig, ThreadError};

use crate::runtime::runtime;

/// A unit of work supplied by generated code
pub type WorkFn = extern "C" fn();

/// Detached tokens keep their high word zero so they never decode as a
/// joinable handle.
fn detached_token(id: u64) -> u64 {
    (id & u64::from(u32::MAX)).max(1)
}

/// Start `work` on a detached thread.
///
/// Returns a non-zero token identifying the thread for diagnostics, or 0 if
/// `work` is null or the thread could not be created. The token cannot be
/// joined.
#[no_mangle]
pub extern "C" fn tether_spawn(work: Option<WorkFn>) -> u64 {
    let Some(work) = work else {
        warn!("tether_spawn: null work function");
        return 0;
    };

    match runtime().manager().spawn_detached(move || work()) {
        Ok(id) => detached_token(id),
        Err(e) => {
            warn!("tether_spawn: {}", e);
            0
        }
    }
}

/// Start `work` on a joinable thread.
///
/// Returns a non-zero handle that the caller owns and must join, or 0 if
/// `work` is null or the thread could not be created.
#[no_mangle]
pub extern "C" fn tether_spawn_joinable(work: Option<WorkFn>) -> u64 {
    let Some(work) = work else {
        warn!("tether_spawn_joinable: null work function");
        return 0;
    };

    let rt = runtime();
    let thread = match rt.manager().spawn_joinable(move || work()) {
        Ok(thread) => thread,
        Err(e) => {
            warn!("tether_spawn_joinable: {}", e);
            return 0;
        }
    };

    match rt.threads.insert(thread) {
        Ok(handle) => handle.into_raw(),
        Err(e) => {
            // The thread is already running; losing its handle detaches it.
            warn!("tether_spawn_joinable: {}", e);
            0
        }
    }
}

/// Block until the thread behind `handle` finishes, then release the handle.
///
/// Joining 0 does nothing. Joining a handle that was already joined, was
/// never issued, or is a detached token is handled according to the
/// configured [`InvalidJoinPolicy`] and never blocks. So is a thread
/// joining its own handle; the handle then stays valid for another thread
/// to join.
#[no_mangle]
pub extern "C" fn tether_thread_join(handle: u64) {
    if handle == 0 {
        trace!("tether_thread_join: sentinel handle");
        return;
    }

    let rt = runtime();
    let target = Handle::<ThreadHandle>::from_raw(handle).and_then(|decoded| {
        rt.threads
            .with(decoded, |joinable| (joinable.thread_id(), joinable.name().to_string()))
    });
    match target {
        Ok((id, name)) if id == std::thread::current().id() => {
            reject_join(rt.manager().config(), &ThreadError::SelfJoin { name });
            return;
        }
        Ok(_) => {}
        Err(e) => {
            reject_join(rt.manager().config(), &e);
            return;
        }
    }

    let thread = match rt.threads.remove_raw(handle) {
        Ok(thread) => thread,
        Err(e) => {
            reject_join(rt.manager().config(), &e);
            return;
        }
    };

    if let Err(e) = thread.join() {
        // Already logged at the thread boundary.
        debug!("tether_thread_join: {}", e);
    }
}

/// Apply the invalid-join policy to a join that cannot proceed
fn reject_join(config: &RuntimeConfig, error: &dyn fmt::Display) {
    match config.invalid_join {
        InvalidJoinPolicy::Ignore => trace!("tether_thread_join: {}", error),
        InvalidJoinPolicy::Warn => warn!("tether_thread_join: {}", error),
        InvalidJoinPolicy::SetError => {
            warn!("tether_thread_join: {}", error);
            error_slot::set_error(config.invalid_join_error_code);
        }
    }
}

/// Suspend the calling thread for at least `ms` milliseconds.
///
/// Zero or negative durations return immediately.
#[no_mangle]
pub extern "C" fn tether_sleep(ms: i64) {
    if let Ok(ms) = u64::try_from(ms) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Number of ABI-spawned threads whose work has not yet returned.
#[no_mangle]
pub extern "C" fn tether_thread_live_count() -> i64 {
    i64::try_from(runtime().manager().stats().live).unwrap_or(i64::MAX)
}

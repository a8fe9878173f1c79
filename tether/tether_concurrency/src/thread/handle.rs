//! Owning handle for a joinable thread.

use log::{debug, error};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tether_core::error::{Result, ThreadError};

use super::manager::{panic_message, ThreadCounters};

/// What a thread body reports back: `Err` carries the rendered panic message
pub(crate) type WorkOutcome = std::result::Result<(), String>;

/// The join capability for a thread spawned with [`SpawnMode::Joinable`].
///
/// `join` consumes the handle, so a thread can be joined at most once.
/// Dropping the handle without joining detaches the thread; its resources
/// are reclaimed when its work returns.
///
/// [`SpawnMode::Joinable`]: super::SpawnMode::Joinable
#[must_use = "dropping a ThreadHandle detaches the thread"]
pub struct ThreadHandle {
    id: u64,
    name: String,
    inner: JoinHandle<WorkOutcome>,
    counters: Arc<ThreadCounters>,
}

impl ThreadHandle {
    pub(crate) fn new(
        id: u64,
        name: String,
        inner: JoinHandle<WorkOutcome>,
        counters: Arc<ThreadCounters>,
    ) -> Self {
        Self {
            id,
            name,
            inner,
            counters,
        }
    }

    /// Runtime-assigned thread identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// OS thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS-level identity of the thread
    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread().id()
    }

    /// Whether the thread's work has returned (non-blocking)
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Block until the thread's work has returned and reclaim the thread.
    ///
    /// Returns [`ThreadError::Panicked`] if the work panicked, and
    /// [`ThreadError::SelfJoin`] without blocking if called from the thread
    /// itself. A rejected self-join drops the handle, detaching the thread.
    pub fn join(self) -> Result<()> {
        if self.thread_id() == thread::current().id() {
            return Err(ThreadError::SelfJoin { name: self.name }.into());
        }

        debug!("Joining {}", self.name);

        let outcome = self.inner.join();
        self.counters.joined.fetch_add(1, Ordering::Relaxed);

        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(message)) => message,
            // The body catches panics from the work itself, so this only
            // happens if the runtime's own wrapper panicked.
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("{}: thread wrapper panicked: {}", self.name, message);
                message
            }
        };

        Err(ThreadError::Panicked {
            name: self.name,
            message,
        }
        .into())
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}

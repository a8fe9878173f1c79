//! Thread creation for compiled programs.
//!
//! Every unit of work runs on its own OS thread. The caller decides at spawn
//! time whether it wants to wait for the thread: a detached thread reclaims
//! itself when its work returns, a joinable thread hands the caller a
//! [`ThreadHandle`] that must be joined to observe completion.

use log::{debug, error, info, trace, warn};
use once_cell::sync::Lazy;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tether_core::error::{Result, ThreadError};
use tether_core::RuntimeConfig;

use super::handle::{ThreadHandle, WorkOutcome};

/// Process-wide manager, configured from `TETHER_CONFIG` on first use.
static GLOBAL: Lazy<ThreadManager> = Lazy::new(|| {
    RuntimeConfig::from_env()
        .and_then(ThreadManager::with_config)
        .unwrap_or_else(|e| {
            warn!("Ignoring runtime configuration: {}", e);
            ThreadManager::new()
        })
});

/// Whether a spawned thread can be waited on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// The thread reclaims itself when its work returns
    Detached,

    /// The caller receives a handle it must join
    Joinable,
}

/// The outcome of a successful spawn.
///
/// Only the joinable variant carries a join capability, so a detached
/// thread cannot be joined by mistake.
#[must_use = "a joinable thread must be joined to observe its completion"]
#[derive(Debug)]
pub enum Spawned {
    /// A detached thread, identified only for diagnostics
    Detached {
        /// Runtime-assigned thread identifier
        id: u64,
    },

    /// A joinable thread
    Joinable(ThreadHandle),
}

impl Spawned {
    /// Runtime-assigned identifier of the spawned thread
    pub fn id(&self) -> u64 {
        match self {
            Self::Detached { id } => *id,
            Self::Joinable(handle) => handle.id(),
        }
    }

    /// Whether this spawn produced a join capability
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Joinable(_))
    }

    /// Take the join capability, if there is one
    pub fn into_handle(self) -> Option<ThreadHandle> {
        match self {
            Self::Detached { .. } => None,
            Self::Joinable(handle) => Some(handle),
        }
    }
}

/// Statistics about threads created by a manager
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThreadStats {
    /// Number of threads successfully created
    pub spawned: usize,

    /// Number of those created detached
    pub detached: usize,

    /// Number of those created joinable
    pub joinable: usize,

    /// Number of joinable threads that have been joined
    pub joined: usize,

    /// Number of threads whose work panicked
    pub panicked: usize,

    /// Number of threads whose work has not yet returned
    pub live: usize,
}

/// Shared counters updated from spawned threads and handles
#[derive(Debug, Default)]
pub(crate) struct ThreadCounters {
    spawned: AtomicUsize,
    detached: AtomicUsize,
    joinable: AtomicUsize,
    pub(crate) joined: AtomicUsize,
    panicked: AtomicUsize,
    live: AtomicUsize,
}

/// Decrements the live count when a thread's body finishes, panic or not
struct LiveGuard(Arc<ThreadCounters>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Creates OS threads running zero-argument units of work
pub struct ThreadManager {
    /// Configuration
    config: RuntimeConfig,

    /// Next thread identifier
    next_id: AtomicU64,

    /// Statistics counters
    counters: Arc<ThreadCounters>,
}

impl ThreadManager {
    /// Create a manager with the default configuration
    pub fn new() -> Self {
        Self::build(RuntimeConfig::default())
    }

    /// Create a manager with the specified configuration.
    ///
    /// Fails if the configuration does not pass [`RuntimeConfig::validate`],
    /// so every thread name and stack size it produces is usable.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RuntimeConfig) -> Self {
        info!(
            "Creating thread manager (prefix: {}, stack size: {:?})",
            config.thread_name_prefix, config.stack_size
        );

        Self {
            config,
            next_id: AtomicU64::new(1),
            counters: Arc::new(ThreadCounters::default()),
        }
    }

    /// The process-wide manager shared with the C ABI
    pub fn global() -> &'static ThreadManager {
        &GLOBAL
    }

    /// The configuration this manager was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Start `work` on a new OS thread.
    ///
    /// The thread runs concurrently with the caller from the moment this
    /// returns. A panic inside `work` is caught at the thread boundary,
    /// logged, and reported by [`ThreadHandle::join`] for joinable threads.
    pub fn spawn<F>(&self, mode: SpawnMode, work: F) -> Result<Spawned>
    where
        F: FnOnce() + Send + 'static,
    {
        match mode {
            SpawnMode::Detached => {
                let (id, name, join_handle) = self.start(work)?;
                self.counters.detached.fetch_add(1, Ordering::Relaxed);
                debug!("Spawned {} (detached)", name);
                // Dropping the std handle detaches the thread.
                drop(join_handle);
                Ok(Spawned::Detached { id })
            }
            SpawnMode::Joinable => self.spawn_joinable(work).map(Spawned::Joinable),
        }
    }

    /// Start `work` on a detached thread and return its identifier
    pub fn spawn_detached<F>(&self, work: F) -> Result<u64>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(SpawnMode::Detached, work).map(|spawned| spawned.id())
    }

    /// Start `work` on a joinable thread
    pub fn spawn_joinable<F>(&self, work: F) -> Result<ThreadHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let (id, name, join_handle) = self.start(work)?;
        self.counters.joinable.fetch_add(1, Ordering::Relaxed);
        debug!("Spawned {} (joinable)", name);

        Ok(ThreadHandle::new(
            id,
            name,
            join_handle,
            Arc::clone(&self.counters),
        ))
    }

    /// Create the OS thread that runs `work` behind the panic boundary
    fn start<F>(&self, work: F) -> Result<(u64, String, JoinHandle<WorkOutcome>)>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.config.thread_name_prefix, id);

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let counters = Arc::clone(&self.counters);
        let thread_name = name.clone();

        // Counted before the spawn so the thread's own decrement can never
        // run first.
        self.counters.live.fetch_add(1, Ordering::SeqCst);

        let spawn_result = builder.spawn(move || {
            let _live = LiveGuard(Arc::clone(&counters));
            trace!("{}: starting", thread_name);

            match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(()) => {
                    trace!("{}: work returned", thread_name);
                    Ok(())
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("{}: work panicked: {}", thread_name, message);
                    counters.panicked.fetch_add(1, Ordering::Relaxed);
                    Err(message)
                }
            }
        });

        match spawn_result {
            Ok(join_handle) => {
                self.counters.spawned.fetch_add(1, Ordering::Relaxed);
                Ok((id, name, join_handle))
            }
            Err(e) => {
                self.counters.live.fetch_sub(1, Ordering::SeqCst);
                warn!("Failed to spawn {}: {}", name, e);
                Err(ThreadError::SpawnFailed(e).into())
            }
        }
    }

    /// Get current statistics for this manager
    pub fn stats(&self) -> ThreadStats {
        ThreadStats {
            spawned: self.counters.spawned.load(Ordering::Relaxed),
            detached: self.counters.detached.load(Ordering::Relaxed),
            joinable: self.counters.joinable.load(Ordering::Relaxed),
            joined: self.counters.joined.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
            live: self.counters.live.load(Ordering::SeqCst),
        }
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThreadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadManager")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Render a panic payload as text
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<unknown panic>".to_string()
    }
}

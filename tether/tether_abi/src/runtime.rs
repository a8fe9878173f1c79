//! Process-wide state behind the C ABI.

use once_cell::sync::Lazy;
use std::sync::Arc;
use tether_concurrency::{Channel, ThreadHandle, ThreadManager};
use tether_core::HandleTable;

static RUNTIME: Lazy<AbiRuntime> = Lazy::new(AbiRuntime::new);

/// Owns every object generated code refers to by handle
pub(crate) struct AbiRuntime {
    /// Joinable threads not yet joined
    pub(crate) threads: HandleTable<ThreadHandle>,

    /// Channels not yet released; clones are held by blocked callers
    pub(crate) channels: HandleTable<Arc<Channel<i64>>>,
}

impl AbiRuntime {
    fn new() -> Self {
        Self {
            threads: HandleTable::new(),
            channels: HandleTable::new(),
        }
    }

    /// The manager every ABI thread is spawned through
    pub(crate) fn manager(&self) -> &'static ThreadManager {
        ThreadManager::global()
    }
}

pub(crate) fn runtime() -> &'static AbiRuntime {
    &RUNTIME
}

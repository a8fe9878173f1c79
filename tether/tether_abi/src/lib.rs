#![deny(warnings)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Tether ABI
//!
//! The `extern "C"` surface that compiled programs link against.
//!
//! Generated code only ever passes fixed-width integers and function
//! pointers across this boundary. Threads and channels live in process-wide
//! handle tables and are addressed by generation-checked `u64` handles, so a
//! stale or forged handle is rejected rather than dereferenced. The value
//! `0` is the universal sentinel: no handle, no error, or "closed and
//! drained" depending on the call.
//!
//! Every entry point is prefixed `tether_`. None of them fault on bad
//! input; invalid handles are logged and answered with a safe default.
//!
//! ## Configuration
//!
//! The runtime reads the TOML files named by `TETHER_CONFIG` (separated like
//! `PATH`, later files overriding earlier ones) the first time any thread
//! entry point is used. See [`tether_core::RuntimeConfig`].

/// Error-slot entry points
pub mod error;

/// Channel entry points
pub mod channel;

/// Thread entry points
pub mod thread;

mod runtime;

pub use channel::{
    tether_channel_close, tether_channel_has_data, tether_channel_is_closed,
    tether_channel_new, tether_channel_receive, tether_channel_receive_tagged,
    tether_channel_release, tether_channel_send,
};
pub use error::{tether_clear_error, tether_get_error, tether_has_error, tether_set_error};
pub use thread::{
    tether_sleep, tether_spawn, tether_spawn_joinable, tether_thread_join,
    tether_thread_live_count, WorkFn,
};

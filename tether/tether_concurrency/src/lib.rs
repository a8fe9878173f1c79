#![deny(warnings)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Tether Concurrency
//!
//! Concurrency primitives for programs emitted by the compiler backend.
//!
//! This crate provides three building blocks:
//!
//! - OS thread spawning, detached or joinable
//! - A bounded blocking channel with explicit close semantics
//! - A per-thread error slot for side-channel failure reporting
//!
//! ## Integration with Other Tether Crates
//!
//! - **tether_core**: Errors, configuration, and generational handles
//! - **tether_abi**: Exposes these primitives to generated code over the C ABI

/// Per-thread side-channel error state
pub mod error_slot;

/// Bounded channels for inter-thread handoff
pub mod sync;

/// Thread spawning, joining, and sleeping
pub mod thread;

// Re-export key types for easier access
pub use error_slot::{clear_error, get_error, has_error, set_error, ErrorSlot};
pub use sync::channel::{Channel, SendError};
pub use thread::{SpawnMode, Spawned, ThreadHandle, ThreadManager};

//! Synchronization primitives for handing values between threads.
//!
//! This module provides a bounded blocking channel with explicit close
//! semantics, generic over the payload type.

pub mod channel;

// Re-export key types from channel
pub use channel::{Channel, ChannelStats, Iter, SendError};

//! # Tether Core
//!
//! `tether_core` provides the building blocks shared by the Tether runtime
//! crates: the error hierarchy, generational handles for objects that cross
//! the C ABI, and runtime configuration.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Tether components
//! - **handle**: Generation-checked integer handles and the table behind them
//! - **config**: TOML-backed runtime configuration

pub mod config;
pub mod error;
pub mod handle;

// Re-export key types for convenience
pub use config::{InvalidJoinPolicy, RuntimeConfig};
pub use error::{ConfigError, Error, HandleError, Result, ThreadError};
pub use handle::{Handle, HandleTable};

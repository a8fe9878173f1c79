//! Error types for the Tether runtime.
//!
//! Errors are organized by subsystem, with each subsystem having its own
//! error type. The root error type, `Error`, can wrap any of them, allowing
//! uniform handling at the top level.
//!
//! Channel close outcomes are deliberately absent: a send rejected by a
//! closed channel and a receive that finds the channel drained are normal
//! exit paths and are reported through the channel's own return types.

use thiserror::Error;

/// Root error type for the Tether runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Thread creation or completion errors
    #[error("Thread error: {0}")]
    Thread(#[from] ThreadError),

    /// Handle table lookup errors
    #[error("Handle error: {0}")]
    Handle(#[from] HandleError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to thread operations.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// The platform refused to create a thread (usually resource exhaustion)
    #[error("Failed to spawn thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// A thread tried to join itself, which would never return
    #[error("Thread {name} cannot join itself")]
    SelfJoin {
        /// Name of the thread that was asked to join itself
        name: String,
    },

    /// The thread's work panicked before returning
    #[error("Thread {name} panicked: {message}")]
    Panicked {
        /// Name of the thread that panicked
        name: String,
        /// Panic payload rendered as text
        message: String,
    },
}

/// Errors related to handle table lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    /// The raw value is the sentinel or does not decode to a table handle
    #[error("Invalid handle: {0:#x}")]
    Invalid(u64),

    /// The slot exists but has been released or reused since the handle was issued
    #[error("Stale handle: {0:#x}")]
    Stale(u64),

    /// Every addressable slot in the table is occupied
    #[error("Handle table exhausted")]
    Exhausted,
}

/// Errors related to runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to load configuration from {path}: {source}")]
    LoadFailed {
        /// Path that was being read
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    /// The configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type used throughout the Tether runtime.
pub type Result<T> = std::result::Result<T, Error>;

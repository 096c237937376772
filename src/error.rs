//! Error types for the scheduling runtime.
//!
//! The error surface is deliberately small. Misuse of handles (executing an
//! ungrabbed task, waiting on a fire-and-forget task, re-parenting a child)
//! is a programmer error caught by assertions in debug builds and tolerated
//! with logged warnings in release builds. Configuration errors (starting a
//! scheduler twice, leaving a priority level unserviced) are panics. Only OS
//! primitive failures travel through [`Error`]: there is no recovery path
//! for them inside the scheduler, so callers decide whether to abort.

use std::io;
use thiserror::Error;

/// A convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the scheduling runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Spawning an OS thread failed.
    #[error("failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        /// The name the thread would have carried.
        name: String,
        /// The underlying OS error.
        source: io::Error,
    },

    /// A platform call (affinity, priority) on a thread failed.
    #[error("platform error: {source}")]
    Platform {
        /// The underlying OS error.
        #[from]
        source: io::Error,
    },
}

//! Error types for guarded resource acquisition.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - A bounded acquisition that runs out of time is reported, never retried
//! - Process termination is the caller's decision, not the primitive's
//!
//! # Error Categories
//!
//! - [`LockError`]: a waiting acquisition did not complete
//! - [`TryLockError`]: a non-waiting acquisition found the lock unavailable
//!
//! Configuration errors live next to the policy in [`crate::config`].

use core::fmt;
use std::time::Duration;
use thiserror::Error;

/// The mode a guard holds the lock in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessMode {
    /// Read-only access shared with any number of other readers.
    Shared,
    /// Read-write access excluding every other holder.
    Exclusive,
}

impl AccessMode {
    /// Returns a short lowercase name for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a waiting acquisition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    /// The bounded policy's deadline passed before the lock became available.
    ///
    /// Under a correct locking discipline this indicates a probable deadlock
    /// or starvation, e.g. a nested exclusive acquisition from one thread.
    #[error("{mode} lock not acquired within {timeout:?}")]
    Timeout {
        /// The mode that was being acquired.
        mode: AccessMode,
        /// The configured wait window that elapsed.
        timeout: Duration,
    },
}

impl LockError {
    /// Returns true if this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the access mode the failed acquisition requested.
    #[must_use]
    pub const fn mode(&self) -> AccessMode {
        match self {
            Self::Timeout { mode, .. } => *mode,
        }
    }
}

/// Error returned when trying to acquire without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryLockError {
    /// The lock is held in a conflicting mode.
    #[error("{mode} lock would block")]
    WouldBlock {
        /// The mode that was being acquired.
        mode: AccessMode,
    },
}

impl TryLockError {
    /// Returns the access mode the failed acquisition requested.
    #[must_use]
    pub const fn mode(&self) -> AccessMode {
        match self {
            Self::WouldBlock { mode } => *mode,
        }
    }
}

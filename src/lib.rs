//! A value shared between threads behind a readers-writer lock.
//!
//! [`GuardedResource<T>`](sync::GuardedResource) owns one value and hands out
//! two kinds of scoped guards:
//!
//! - [`ExclusiveGuard`](sync::ExclusiveGuard): read-write, one at a time
//! - [`SharedGuard`](sync::SharedGuard): read-only, any number at once
//!
//! Each guard acquires the lock when created and releases it when dropped.
//! A per-resource [`LockPolicy`](config::LockPolicy) decides whether
//! acquisition waits forever or gives up after a fixed window, reporting
//! [`LockError::Timeout`] so a probable deadlock surfaces instead of hanging.
//!
//! # Example
//!
//! ```
//! use guarded_resource::{GuardedResource, LockError, LockPolicy};
//! use std::time::Duration;
//!
//! let policy = LockPolicy::bounded_with(Duration::from_millis(10), Duration::from_millis(10));
//! let resource = GuardedResource::with_policy(0_u32, policy);
//!
//! let mut writer = resource.exclusive_lock()?;
//! *writer += 1;
//!
//! // A second acquisition while the writer is alive times out.
//! assert!(resource.shared_lock().unwrap_err().is_timeout());
//!
//! drop(writer);
//! assert_eq!(*resource.shared_lock()?, 1);
//! # Ok::<(), LockError>(())
//! ```
//!
//! # Features
//!
//! - `tracing-integration` (default): structured logging via `tracing`
//! - `lock-metrics`: per-resource acquisition and contention counters
//! - `serde`: serialize policies and metric snapshots

pub mod config;
pub mod error;
pub mod sync;

pub(crate) mod tracing_compat;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{ConfigError, LockPolicy};
pub use error::{AccessMode, LockError, TryLockError};
pub use sync::{ExclusiveGuard, GuardedResource, LockMetricsSnapshot, LockState, SharedGuard};

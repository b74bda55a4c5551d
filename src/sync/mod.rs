//! Guarded resources with scoped lock guards.
//!
//! This module provides a value wrapper where every access goes through a
//! guard that holds a readers-writer lock for exactly its own lifetime.
//!
//! # Primitives
//!
//! - [`GuardedResource`]: owns the value and the lock
//! - [`ExclusiveGuard`]: read-write access, one holder
//! - [`SharedGuard`]: read-only access, many holders
//!
//! # Two-Phase Pattern
//!
//! - **Phase 1 (Wait)**: Wait for the lock, indefinitely or up to the
//!   policy's window. A bounded wait that expires returns an error and
//!   holds nothing.
//! - **Phase 2 (Hold)**: Hold the guard. Release happens on drop, including
//!   during unwinding.

mod metrics;
mod resource;

pub use metrics::LockMetricsSnapshot;
pub use resource::{ExclusiveGuard, GuardedResource, LockState, SharedGuard};

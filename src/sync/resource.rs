//! A value owned by a readers-writer lock and reachable only through guards.
//!
//! [`GuardedResource`] owns one value and one [`parking_lot::RwLock`]. All
//! access goes through two scoped accessors:
//!
//! - [`ExclusiveGuard`]: read-write, at most one alive per resource
//! - [`SharedGuard`]: read-only, any number alive at once
//!
//! Guards acquire on construction and release on drop, on every exit path
//! including unwinding. `parking_lot` locks do not poison, so a panic while a
//! guard is held leaves the resource usable.
//!
//! # Policy
//!
//! Each resource carries a [`LockPolicy`] fixed at construction:
//!
//! | Policy     | `exclusive_lock` / `shared_lock`                         |
//! |------------|----------------------------------------------------------|
//! | `Blocking` | Wait indefinitely, always `Ok`                           |
//! | `Bounded`  | Wait up to the mode's window, then `LockError::Timeout`  |
//!
//! The bounded policy turns a would-be deadlock into an observable failure.
//! Callers that want the failure to end the process use
//! [`GuardedResource::exclusive_lock_or_abort`] and
//! [`GuardedResource::shared_lock_or_abort`].
//!
//! # Fairness
//!
//! Ordering between waiters is whatever `parking_lot::RwLock` provides
//! (eventual fairness, with waiting writers blocking new readers). It is
//! inherited, not designed. Locking is not re-entrant: taking a second guard
//! on the same resource from a thread that already holds an exclusive guard
//! deadlocks under `Blocking` and times out under `Bounded`.
//!
//! # Example
//!
//! ```
//! use guarded_resource::sync::GuardedResource;
//!
//! let resource = GuardedResource::bounded(String::from("ciao"));
//!
//! {
//!     let a = resource.shared_lock()?;
//!     let b = resource.shared_lock()?;
//!     assert_eq!(*a, *b);
//! }
//!
//! resource.exclusive_lock()?.push_str(" mondo");
//! assert_eq!(resource.with_shared(|s| s.len())?, 10);
//! # Ok::<(), guarded_resource::LockError>(())
//! ```

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::LockPolicy;
use crate::error::{AccessMode, LockError, TryLockError};
use crate::sync::metrics::{HoldStart, LockMetrics, LockMetricsSnapshot};
use crate::tracing_compat::{debug, error, trace};

/// Observable state of a resource's lock.
///
/// Obtained from [`GuardedResource::state`]. The value is a snapshot: under
/// concurrent use it may be stale by the time it is inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No guard is alive.
    Unlocked,
    /// The given number of shared guards are alive.
    Shared(usize),
    /// One exclusive guard is alive.
    Exclusive,
}

impl LockState {
    /// Number of guards currently holding the lock.
    #[must_use]
    pub const fn holders(self) -> usize {
        match self {
            Self::Unlocked => 0,
            Self::Shared(n) => n,
            Self::Exclusive => 1,
        }
    }
}

/// A value guarded by a readers-writer lock.
///
/// See the [module documentation](self) for the locking discipline.
pub struct GuardedResource<T> {
    lock: RwLock<T>,
    policy: LockPolicy,
    // Observation only; exclusion is enforced by `lock`.
    readers: AtomicUsize,
    metrics: LockMetrics,
}

impl<T> GuardedResource<T> {
    /// Creates a resource with the blocking policy.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_policy(value, LockPolicy::Blocking)
    }

    /// Creates a resource with the bounded policy and its default windows
    /// (100 ms exclusive, 1 s shared).
    #[must_use]
    pub fn bounded(value: T) -> Self {
        Self::with_policy(value, LockPolicy::bounded())
    }

    /// Creates a resource with the given policy.
    ///
    /// The policy is taken as-is; use [`LockPolicy::validate`] first if it
    /// comes from untrusted configuration.
    #[must_use]
    pub fn with_policy(value: T, policy: LockPolicy) -> Self {
        Self {
            lock: RwLock::new(value),
            policy,
            readers: AtomicUsize::new(0),
            metrics: LockMetrics::default(),
        }
    }

    /// Creates a resource from a fallible constructor, propagating its error.
    ///
    /// # Errors
    ///
    /// Returns whatever error `init` returns.
    pub fn try_new_with<E, F>(policy: LockPolicy, init: F) -> Result<Self, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        Ok(Self::with_policy(init()?, policy))
    }

    /// Returns the policy this resource was created with.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Acquires an exclusive guard, waiting according to the policy.
    ///
    /// # Errors
    ///
    /// Under `Blocking` this never fails. Under `Bounded` it returns
    /// [`LockError::Timeout`] once the exclusive window passes.
    pub fn exclusive_lock(&self) -> Result<ExclusiveGuard<'_, T>, LockError> {
        if let Some(guard) = self.lock.try_write() {
            return Ok(self.exclusive_guard(guard, false, Duration::ZERO));
        }

        trace!(mode = %AccessMode::Exclusive, "lock contended, waiting");
        let start = Instant::now();
        let guard = match self.policy.exclusive_timeout() {
            None => self.lock.write(),
            Some(timeout) => match self.lock.try_write_for(timeout) {
                Some(guard) => guard,
                None => return Err(self.timed_out(AccessMode::Exclusive, timeout, start)),
            },
        };
        Ok(self.exclusive_guard(guard, true, start.elapsed()))
    }

    /// Acquires a shared guard, waiting according to the policy.
    ///
    /// # Errors
    ///
    /// Under `Blocking` this never fails. Under `Bounded` it returns
    /// [`LockError::Timeout`] once the shared window passes.
    pub fn shared_lock(&self) -> Result<SharedGuard<'_, T>, LockError> {
        if let Some(guard) = self.lock.try_read() {
            return Ok(self.shared_guard(guard, false, Duration::ZERO));
        }

        trace!(mode = %AccessMode::Shared, "lock contended, waiting");
        let start = Instant::now();
        let guard = match self.policy.shared_timeout() {
            None => self.lock.read(),
            Some(timeout) => match self.lock.try_read_for(timeout) {
                Some(guard) => guard,
                None => return Err(self.timed_out(AccessMode::Shared, timeout, start)),
            },
        };
        Ok(self.shared_guard(guard, true, start.elapsed()))
    }

    /// Like [`exclusive_lock`](Self::exclusive_lock), but a timeout is logged
    /// and aborts the process.
    pub fn exclusive_lock_or_abort(&self) -> ExclusiveGuard<'_, T> {
        match self.exclusive_lock() {
            Ok(guard) => guard,
            Err(err) => abort_on(err),
        }
    }

    /// Like [`shared_lock`](Self::shared_lock), but a timeout is logged and
    /// aborts the process.
    pub fn shared_lock_or_abort(&self) -> SharedGuard<'_, T> {
        match self.shared_lock() {
            Ok(guard) => guard,
            Err(err) => abort_on(err),
        }
    }

    /// Tries to acquire an exclusive guard without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryLockError::WouldBlock`] if any guard is alive.
    pub fn try_exclusive_lock(&self) -> Result<ExclusiveGuard<'_, T>, TryLockError> {
        self.lock
            .try_write()
            .map(|guard| self.exclusive_guard(guard, false, Duration::ZERO))
            .ok_or(TryLockError::WouldBlock {
                mode: AccessMode::Exclusive,
            })
    }

    /// Tries to acquire a shared guard without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryLockError::WouldBlock`] if an exclusive guard is alive
    /// or a writer is queued.
    pub fn try_shared_lock(&self) -> Result<SharedGuard<'_, T>, TryLockError> {
        self.lock
            .try_read()
            .map(|guard| self.shared_guard(guard, false, Duration::ZERO))
            .ok_or(TryLockError::WouldBlock {
                mode: AccessMode::Shared,
            })
    }

    /// Executes a closure with exclusive access to the value.
    ///
    /// # Errors
    ///
    /// Fails as [`exclusive_lock`](Self::exclusive_lock) does; `f` is not
    /// called then.
    pub fn with_exclusive<F, R>(&self, f: F) -> Result<R, LockError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.exclusive_lock()?;
        Ok(f(&mut guard))
    }

    /// Executes a closure with shared access to the value.
    ///
    /// # Errors
    ///
    /// Fails as [`shared_lock`](Self::shared_lock) does; `f` is not called
    /// then.
    pub fn with_shared<F, R>(&self, f: F) -> Result<R, LockError>
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.shared_lock()?;
        Ok(f(&guard))
    }

    /// Replaces the value under an exclusive guard, returning the old one.
    ///
    /// # Errors
    ///
    /// Fails as [`exclusive_lock`](Self::exclusive_lock) does; the value is
    /// left untouched then.
    pub fn replace(&self, value: T) -> Result<T, LockError> {
        self.with_exclusive(|current| std::mem::replace(current, value))
    }

    /// Returns a snapshot of the lock state.
    ///
    /// The reader count is kept beside the lock, not inside it. A dropping
    /// shared guard decrements the count just before it releases the lock,
    /// so for that instant `state()` can report [`LockState::Unlocked`]
    /// while [`is_locked`](Self::is_locked) still returns true.
    #[must_use]
    pub fn state(&self) -> LockState {
        if self.lock.is_locked_exclusive() {
            return LockState::Exclusive;
        }
        match self.readers.load(Ordering::Acquire) {
            0 => LockState::Unlocked,
            n => LockState::Shared(n),
        }
    }

    /// Returns true if any guard holds the lock.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Returns true if an exclusive guard holds the lock.
    #[inline]
    #[must_use]
    pub fn is_locked_exclusive(&self) -> bool {
        self.lock.is_locked_exclusive()
    }

    /// Returns a mutable reference to the value.
    ///
    /// No locking is needed: `&mut self` proves no guard is alive.
    pub fn get_mut(&mut self) -> &mut T {
        self.lock.get_mut()
    }

    /// Consumes the resource and returns the value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }

    /// Returns a snapshot of acquisition metrics.
    ///
    /// Empty unless the `lock-metrics` feature is enabled.
    #[must_use]
    pub fn metrics(&self) -> LockMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Resets acquisition metrics to zero.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn exclusive_guard<'a>(
        &'a self,
        guard: RwLockWriteGuard<'a, T>,
        contended: bool,
        waited: Duration,
    ) -> ExclusiveGuard<'a, T> {
        let hold = self
            .metrics
            .record_acquired(AccessMode::Exclusive, contended, waited);
        ExclusiveGuard {
            guard,
            metrics: &self.metrics,
            hold,
        }
    }

    fn shared_guard<'a>(
        &'a self,
        guard: RwLockReadGuard<'a, T>,
        contended: bool,
        waited: Duration,
    ) -> SharedGuard<'a, T> {
        self.readers.fetch_add(1, Ordering::AcqRel);
        let hold = self
            .metrics
            .record_acquired(AccessMode::Shared, contended, waited);
        SharedGuard {
            guard,
            readers: &self.readers,
            metrics: &self.metrics,
            hold,
        }
    }

    #[cold]
    fn timed_out(&self, mode: AccessMode, timeout: Duration, start: Instant) -> LockError {
        let waited = start.elapsed();
        self.metrics.record_timeout(waited);
        debug!(
            mode = %mode,
            timeout_ms = millis(timeout),
            waited_ms = millis(waited),
            "bounded lock acquisition timed out"
        );
        LockError::Timeout { mode, timeout }
    }
}

#[cfg_attr(not(feature = "tracing-integration"), allow(dead_code))]
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cold]
#[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
fn abort_on(err: LockError) -> ! {
    error!(error = %err, mode = %err.mode(), "probable deadlock, aborting process");
    std::process::abort()
}

impl<T: Default> Default for GuardedResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for GuardedResource<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> fmt::Debug for GuardedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedResource")
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Read-write access to a [`GuardedResource`], released on drop.
#[must_use = "guard will be immediately released if not held"]
pub struct ExclusiveGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    metrics: &'a LockMetrics,
    hold: HoldStart,
}

impl<T> Deref for ExclusiveGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for ExclusiveGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T> Drop for ExclusiveGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // The write lock itself is released when `guard` drops after this.
        self.metrics.record_released(self.hold);
    }
}

impl<T: fmt::Debug> fmt::Debug for ExclusiveGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveGuard")
            .field("data", &*self.guard)
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for ExclusiveGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (*self.guard).fmt(f)
    }
}

/// Read-only access to a [`GuardedResource`], released on drop.
#[must_use = "guard will be immediately released if not held"]
pub struct SharedGuard<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    readers: &'a AtomicUsize,
    metrics: &'a LockMetrics,
    hold: HoldStart,
}

impl<T> Deref for SharedGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> Drop for SharedGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.readers.fetch_sub(1, Ordering::AcqRel);
        self.metrics.record_released(self.hold);
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGuard")
            .field("data", &*self.guard)
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for SharedGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (*self.guard).fmt(f)
    }
}

//! Feature-gated acquisition metrics for guarded resources.
//!
//! When the `lock-metrics` feature is enabled, every [`GuardedResource`]
//! tracks acquisitions per mode, contention, timeouts, wait time and hold
//! time. When disabled, the bookkeeping is a zero-sized no-op.
//!
//! [`GuardedResource`]: crate::sync::GuardedResource

use crate::error::AccessMode;

/// Snapshot of lock acquisition metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockMetricsSnapshot {
    /// Successful exclusive acquisitions.
    pub exclusive_acquisitions: u64,
    /// Successful shared acquisitions.
    pub shared_acquisitions: u64,
    /// Acquisitions that found the lock held and had to wait.
    pub contentions: u64,
    /// Bounded acquisitions that gave up.
    pub timeouts: u64,
    /// Cumulative nanoseconds spent waiting to acquire.
    pub wait_ns: u64,
    /// Maximum single wait duration in nanoseconds.
    pub max_wait_ns: u64,
    /// Cumulative nanoseconds guards were held.
    pub hold_ns: u64,
    /// Maximum single hold duration in nanoseconds.
    pub max_hold_ns: u64,
}

impl LockMetricsSnapshot {
    /// Total successful acquisitions in either mode.
    #[must_use]
    pub const fn acquisitions(&self) -> u64 {
        self.exclusive_acquisitions + self.shared_acquisitions
    }
}

// ── Feature-gated implementation ──────────────────────────────────────────

#[cfg(feature = "lock-metrics")]
mod inner {
    use super::{AccessMode, LockMetricsSnapshot};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    /// Counters split into two cache lines: acquisition-path counters are
    /// written on lock, hold counters on guard drop.
    #[derive(Debug)]
    #[repr(C)]
    pub(crate) struct LockMetrics {
        // ── Cache line 1: updated on acquire ──
        exclusive_acquisitions: AtomicU64,
        shared_acquisitions: AtomicU64,
        contentions: AtomicU64,
        timeouts: AtomicU64,
        wait_ns: AtomicU64,
        max_wait_ns: AtomicU64,
        _pad: [u8; 16],
        // ── Cache line 2: updated on release ──
        hold_ns: AtomicU64,
        max_hold_ns: AtomicU64,
    }

    impl Default for LockMetrics {
        fn default() -> Self {
            Self {
                exclusive_acquisitions: AtomicU64::new(0),
                shared_acquisitions: AtomicU64::new(0),
                contentions: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
                wait_ns: AtomicU64::new(0),
                max_wait_ns: AtomicU64::new(0),
                _pad: [0; 16],
                hold_ns: AtomicU64::new(0),
                max_hold_ns: AtomicU64::new(0),
            }
        }
    }

    /// Start of a hold interval, carried by each guard.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct HoldStart(Instant);

    fn nanos(duration: Duration) -> u64 {
        u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
    }

    impl LockMetrics {
        fn update_max(current: &AtomicU64, value: u64) {
            let mut old = current.load(Ordering::Relaxed);
            while value > old {
                match current.compare_exchange_weak(
                    old,
                    value,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(actual) => old = actual,
                }
            }
        }

        pub(crate) fn record_acquired(
            &self,
            mode: AccessMode,
            contended: bool,
            waited: Duration,
        ) -> HoldStart {
            let acquisitions = match mode {
                AccessMode::Exclusive => &self.exclusive_acquisitions,
                AccessMode::Shared => &self.shared_acquisitions,
            };
            acquisitions.fetch_add(1, Ordering::Relaxed);
            if contended {
                self.contentions.fetch_add(1, Ordering::Relaxed);
            }
            let wait_ns = nanos(waited);
            self.wait_ns.fetch_add(wait_ns, Ordering::Relaxed);
            Self::update_max(&self.max_wait_ns, wait_ns);
            HoldStart(Instant::now())
        }

        pub(crate) fn record_timeout(&self, waited: Duration) {
            self.contentions.fetch_add(1, Ordering::Relaxed);
            self.timeouts.fetch_add(1, Ordering::Relaxed);
            let wait_ns = nanos(waited);
            self.wait_ns.fetch_add(wait_ns, Ordering::Relaxed);
            Self::update_max(&self.max_wait_ns, wait_ns);
        }

        pub(crate) fn record_released(&self, start: HoldStart) {
            let hold_ns = nanos(start.0.elapsed());
            self.hold_ns.fetch_add(hold_ns, Ordering::Relaxed);
            Self::update_max(&self.max_hold_ns, hold_ns);
        }

        pub(crate) fn snapshot(&self) -> LockMetricsSnapshot {
            LockMetricsSnapshot {
                exclusive_acquisitions: self.exclusive_acquisitions.load(Ordering::Relaxed),
                shared_acquisitions: self.shared_acquisitions.load(Ordering::Relaxed),
                contentions: self.contentions.load(Ordering::Relaxed),
                timeouts: self.timeouts.load(Ordering::Relaxed),
                wait_ns: self.wait_ns.load(Ordering::Relaxed),
                max_wait_ns: self.max_wait_ns.load(Ordering::Relaxed),
                hold_ns: self.hold_ns.load(Ordering::Relaxed),
                max_hold_ns: self.max_hold_ns.load(Ordering::Relaxed),
            }
        }

        pub(crate) fn reset(&self) {
            for counter in [
                &self.exclusive_acquisitions,
                &self.shared_acquisitions,
                &self.contentions,
                &self.timeouts,
                &self.wait_ns,
                &self.max_wait_ns,
                &self.hold_ns,
                &self.max_hold_ns,
            ] {
                counter.store(0, Ordering::Relaxed);
            }
        }
    }
}

// ── No-op implementation (feature disabled) ───────────────────────────────

#[cfg(not(feature = "lock-metrics"))]
mod inner {
    use super::{AccessMode, LockMetricsSnapshot};
    use std::time::Duration;

    #[derive(Debug, Default)]
    pub(crate) struct LockMetrics;

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct HoldStart;

    impl LockMetrics {
        #[inline]
        pub(crate) fn record_acquired(
            &self,
            _mode: AccessMode,
            _contended: bool,
            _waited: Duration,
        ) -> HoldStart {
            HoldStart
        }

        #[inline]
        pub(crate) fn record_timeout(&self, _waited: Duration) {}

        #[inline]
        pub(crate) fn record_released(&self, _start: HoldStart) {}

        pub(crate) fn snapshot(&self) -> LockMetricsSnapshot {
            LockMetricsSnapshot::default()
        }

        pub(crate) fn reset(&self) {}
    }
}

pub(crate) use inner::{HoldStart, LockMetrics};

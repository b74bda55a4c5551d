//! Acquisition policy for guarded resources.
//!
//! This module provides:
//! - [`LockPolicy`], chosen once per resource and immutable thereafter
//! - Validation for guardrail invariants
//! - Layered loading (base policy + environment overrides)
//!
//! # Environment overrides
//!
//! | Variable                                 | Value                      |
//! |------------------------------------------|----------------------------|
//! | `GUARDED_RESOURCE_POLICY`                | `blocking` or `bounded`    |
//! | `GUARDED_RESOURCE_EXCLUSIVE_TIMEOUT_MS`  | milliseconds               |
//! | `GUARDED_RESOURCE_SHARED_TIMEOUT_MS`     | milliseconds               |
//!
//! Setting either timeout switches the policy to bounded.

use crate::error::AccessMode;
use crate::tracing_compat::debug;
use std::collections::BTreeMap;
use std::time::Duration;

/// Prefix shared by every environment override key.
pub const ENV_PREFIX: &str = "GUARDED_RESOURCE_";

/// Default wait window for exclusive acquisition under the bounded policy.
pub const DEFAULT_EXCLUSIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default wait window for shared acquisition under the bounded policy.
///
/// Longer than the exclusive window: readers are expected to wait out a
/// writer, while a writer waiting on another writer usually means a bug.
pub const DEFAULT_SHARED_TIMEOUT: Duration = Duration::from_secs(1);

/// How long an acquisition may wait before it is reported as failed.
///
/// # Example
///
/// ```
/// # use guarded_resource::config::LockPolicy;
/// # use std::time::Duration;
/// let policy = LockPolicy::bounded();
/// assert_eq!(policy.exclusive_timeout(), Some(Duration::from_millis(100)));
/// assert_eq!(policy.shared_timeout(), Some(Duration::from_secs(1)));
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LockPolicy {
    /// Wait indefinitely. A true deadlock hangs forever.
    #[default]
    Blocking,
    /// Wait at most the given window per mode, then fail.
    Bounded {
        /// Upper bound on waiting for an exclusive guard.
        exclusive_timeout: Duration,
        /// Upper bound on waiting for a shared guard.
        shared_timeout: Duration,
    },
}

impl LockPolicy {
    /// Bounded policy with the default windows (100 ms exclusive, 1 s shared).
    #[must_use]
    pub const fn bounded() -> Self {
        Self::Bounded {
            exclusive_timeout: DEFAULT_EXCLUSIVE_TIMEOUT,
            shared_timeout: DEFAULT_SHARED_TIMEOUT,
        }
    }

    /// Bounded policy with explicit windows.
    #[must_use]
    pub const fn bounded_with(exclusive_timeout: Duration, shared_timeout: Duration) -> Self {
        Self::Bounded {
            exclusive_timeout,
            shared_timeout,
        }
    }

    /// Returns true for the bounded policy.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }

    /// Wait window for the given mode, or `None` when blocking.
    #[must_use]
    pub const fn timeout_for(&self, mode: AccessMode) -> Option<Duration> {
        match (self, mode) {
            (Self::Blocking, _) => None,
            (
                Self::Bounded {
                    exclusive_timeout, ..
                },
                AccessMode::Exclusive,
            ) => Some(*exclusive_timeout),
            (Self::Bounded { shared_timeout, .. }, AccessMode::Shared) => Some(*shared_timeout),
        }
    }

    /// Wait window for exclusive acquisition, or `None` when blocking.
    #[must_use]
    pub const fn exclusive_timeout(&self) -> Option<Duration> {
        self.timeout_for(AccessMode::Exclusive)
    }

    /// Wait window for shared acquisition, or `None` when blocking.
    #[must_use]
    pub const fn shared_timeout(&self) -> Option<Duration> {
        self.timeout_for(AccessMode::Shared)
    }

    /// Validates the policy for basic sanity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] if a bounded window is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Self::Bounded {
            exclusive_timeout,
            shared_timeout,
        } = self
        {
            if exclusive_timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(AccessMode::Exclusive));
            }
            if shared_timeout.is_zero() {
                return Err(ConfigError::ZeroTimeout(AccessMode::Shared));
            }
        }
        Ok(())
    }

    /// Loads the default policy with environment overrides applied.
    ///
    /// # Errors
    ///
    /// See [`with_overrides`](Self::with_overrides).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides on top of `self` and validates the result.
    ///
    /// Every variable starting with [`ENV_PREFIX`] is treated as an override.
    ///
    /// # Errors
    ///
    /// See [`with_overrides`](Self::with_overrides).
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let overrides: BTreeMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self.with_overrides(&overrides)
    }

    /// Applies explicit `KEY=value` overrides on top of `self` and validates
    /// the result. Keys use the same names as the environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unknown key,
    /// [`ConfigError::Parse`] for a malformed value, and
    /// [`ConfigError::ZeroTimeout`] if the resulting policy has a zero window.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        // The policy kind first, so timeouts layer onto it regardless of order.
        if let Some(value) = overrides.get(POLICY_KEY) {
            self = apply_policy_kind(self, value, POLICY_KEY)?;
            debug!(key = POLICY_KEY, value = %value, "applied lock policy override");
        }
        for (key, value) in overrides {
            if key == POLICY_KEY {
                continue;
            }
            self = apply_override(self, key, value)?;
            debug!(key = %key, value = %value, "applied lock policy override");
        }
        self.validate()?;
        Ok(self)
    }
}

const POLICY_KEY: &str = "GUARDED_RESOURCE_POLICY";
const EXCLUSIVE_TIMEOUT_KEY: &str = "GUARDED_RESOURCE_EXCLUSIVE_TIMEOUT_MS";
const SHARED_TIMEOUT_KEY: &str = "GUARDED_RESOURCE_SHARED_TIMEOUT_MS";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// An override key is not recognized.
    #[error("invalid override: {0}")]
    InvalidOverride(String),
    /// A bounded wait window is zero.
    #[error("{0} timeout must be > 0")]
    ZeroTimeout(AccessMode),
}

fn apply_policy_kind(policy: LockPolicy, value: &str, key: &str) -> Result<LockPolicy, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "blocking" => Ok(LockPolicy::Blocking),
        // Keep explicit windows if the base was already bounded.
        "bounded" => Ok(if policy.is_bounded() {
            policy
        } else {
            LockPolicy::bounded()
        }),
        other => Err(ConfigError::Parse(format!(
            "invalid policy for {key}: {other}"
        ))),
    }
}

fn apply_override(policy: LockPolicy, key: &str, value: &str) -> Result<LockPolicy, ConfigError> {
    let (exclusive_timeout, shared_timeout) = match policy {
        LockPolicy::Blocking => (DEFAULT_EXCLUSIVE_TIMEOUT, DEFAULT_SHARED_TIMEOUT),
        LockPolicy::Bounded {
            exclusive_timeout,
            shared_timeout,
        } => (exclusive_timeout, shared_timeout),
    };
    match key {
        EXCLUSIVE_TIMEOUT_KEY => Ok(LockPolicy::Bounded {
            exclusive_timeout: parse_duration_ms(value, key)?,
            shared_timeout,
        }),
        SHARED_TIMEOUT_KEY => Ok(LockPolicy::Bounded {
            exclusive_timeout,
            shared_timeout: parse_duration_ms(value, key)?,
        }),
        _ => Err(ConfigError::InvalidOverride(key.to_string())),
    }
}

fn parse_u64(value: &str, key: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::Parse(format!("invalid u64 for {key}: {value}")))
}

fn parse_duration_ms(value: &str, key: &str) -> Result<Duration, ConfigError> {
    let millis = parse_u64(value, key)?;
    Ok(Duration::from_millis(millis))
}

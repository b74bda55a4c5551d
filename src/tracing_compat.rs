//! Logging shim over `tracing`.
//!
//! With the `tracing-integration` feature (default) the macros here are the
//! `tracing` macros. Without it they expand to nothing, so call sites never
//! need their own `cfg` gates.

#[cfg(feature = "tracing-integration")]
pub(crate) use tracing::{debug, error, trace};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    macro_rules! noop_event {
        ($($arg:tt)*) => {};
    }

    pub(crate) use noop_event as debug;
    pub(crate) use noop_event as error;
    pub(crate) use noop_event as trace;
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop::{debug, error, trace};

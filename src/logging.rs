#![allow(dead_code, unused_macros)]

//! Crate-internal log macros.
//!
//! Everything here expands to nothing unless the `logging` feature pulls in the `log` crate,
//! so the container hot paths carry no formatting cost by default.

pub(crate) const TARGET_ALLOC: &str = "relic::alloc";
pub(crate) const TARGET_ARRAY: &str = "relic::array";

macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: $target, $($arg)+);
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!($($arg)+);
    )
}

macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: $target, $($arg)+);
    );
    ($($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!($($arg)+);
    )
}

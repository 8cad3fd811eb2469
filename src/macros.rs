//! Internal logging macros.
//!
//! `defmt` feature enabled → defmt
//! `std` feature enabled   → tracing
//! neither                 → arguments are type-checked and discarded

#![allow(unused_macros)]

macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::error!($($arg)*);
        #[cfg(feature = "std")]
        tracing::error!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "std")))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
        #[cfg(feature = "std")]
        tracing::warn!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "std")))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)*);
        #[cfg(feature = "std")]
        tracing::info!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "std")))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
        #[cfg(feature = "std")]
        tracing::debug!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "std")))]
        let _ = core::format_args!($($arg)*);
    }};
}

macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::trace!($($arg)*);
        #[cfg(feature = "std")]
        tracing::trace!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "std")))]
        let _ = core::format_args!($($arg)*);
    }};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_trace;
pub(crate) use log_warn;

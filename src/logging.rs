//! Feature-gated logging macros.
//!
//! With the `logging` feature these forward to `tracing`; without it every
//! invocation expands to nothing, so arguments are never evaluated.
//!
//! ```rust,ignore
//! use crate::logging::{debug, warn};
//!
//! debug!(rows = rows.len(), "map call completed");
//! warn!(error = %message, "map function threw");
//! ```

/// Log target used for `console.*` calls made by map functions.
#[cfg_attr(not(feature = "logging"), allow(dead_code))]
pub(crate) const SCRIPT_TARGET: &str = "view_map::script";

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => { tracing::trace!($($arg)*) }
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) }
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) }
}

#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) }
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_error {
    ($($arg:tt)*) => { tracing::error!($($arg)*) }
}

#[cfg(not(feature = "logging"))]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use log_debug as debug;
#[allow(unused_imports)]
pub(crate) use log_error as error;
#[allow(unused_imports)]
pub(crate) use log_info as info;
#[allow(unused_imports)]
pub(crate) use log_trace as trace;
#[allow(unused_imports)]
pub(crate) use log_warn as warn;

//! Logging shim.
//!
//! With the `tracing` feature the usual macros are re-exported from
//! `tracing`. Without it they expand to nothing, so call sites only pick
//! the import:
//!
//! ```ignore
//! #[cfg(feature = "tracing")]
//! use crate::logging::debug;
//! #[cfg(not(feature = "tracing"))]
//! use crate::debug;
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

/// Install a global JSON subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}

//! Logging shims for the scene graph and archive reader.
//!
//! Document loading warns about legacy spellings it had to default
//! (unknown unit and page-layout names); those diagnostics flow through
//! `warn!`. With the `tracing` feature the macros forward to `tracing`;
//! without it they expand to nothing and the crate stays free of any
//! logging dependency.

#[cfg(feature = "tracing")]
pub use tracing::{debug, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, warn};

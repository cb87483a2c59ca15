//! Conditional logging macros.
//!
//! With the `tracing` feature these re-export `tracing` macros; without it
//! they expand to nothing. Warnings that a caller must be able to observe
//! also go through [`crate::errors::Warnings`], which does not depend on
//! this feature.

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

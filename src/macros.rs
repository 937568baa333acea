//! Formatting macros for the `f` variants of the producer and forced
//! termination APIs.
//!
//! Each macro formats its arguments like `format!` and appends a newline.
//!
//! # Examples
//!
//! ```
//! use async_log_sink::prelude::*;
//! use async_log_sink::printf;
//! use std::sync::Arc;
//!
//! let logger = Arc::new(AsyncLogger::new(SharedBuffer::new(), 16, 1024));
//! let _consumer = logger.spawn().unwrap();
//!
//! let port = 8080;
//! printf!(logger, "listening on port {}", port);
//! logger.finish().unwrap();
//! ```

/// Submit a formatted record followed by a newline.
#[macro_export]
macro_rules! printf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.printf(format_args!($($arg)+))
    };
}

/// Write `fatal: ` and a formatted message, flush, and exit with status 1.
#[macro_export]
macro_rules! fatalf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.fatalf(format_args!($($arg)+))
    };
}

/// Write `panic: ` and a formatted message, flush, and panic.
///
/// # Examples
///
/// ```should_panic
/// use async_log_sink::prelude::*;
/// use async_log_sink::panicf;
///
/// let logger = AsyncLogger::new(SharedBuffer::new(), 16, 64);
/// panicf!(logger, "invariant broken: {}", 42);
/// ```
#[macro_export]
macro_rules! panicf {
    ($logger:expr, $($arg:tt)+) => {
        $logger.panicf(format_args!($($arg)+))
    };
}

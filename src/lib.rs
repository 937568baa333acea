//! # Async Log Sink
//!
//! An in-process asynchronous log sink: any number of producer threads hand
//! text records to a single consumer loop, which performs every write to one
//! buffered output stream.
//!
//! ## Features
//!
//! - **Backpressure, not buffering**: producers rendezvous with the consumer
//!   loop, so memory stays bounded to one record per blocked producer
//! - **Order preserving**: records are written whole, in the order the
//!   consumer receives them
//! - **Explicit lifecycle**: [`AsyncLogger::run`], [`AsyncLogger::finish`]
//!   and the `fatal`/`panic` families for forced termination
//! - **Non-blocking front-end**: [`Dispatcher`] with a bounded queue and an
//!   [`OverflowPolicy`]
//!
//! ```
//! use async_log_sink::prelude::*;
//! use std::sync::Arc;
//!
//! let out = SharedBuffer::new();
//! let logger = Arc::new(AsyncLogger::new(out.clone(), 16, 1024));
//! let _consumer = logger.spawn().unwrap();
//!
//! logger.println("hello");
//! async_log_sink::printf!(logger, "{} + {} = {}", 1, 1, 2);
//! logger.finish().unwrap();
//!
//! assert_eq!(out.to_string_lossy(), "hello\n1 + 1 = 2\n");
//! ```

pub mod core;
pub mod dispatcher;
#[cfg(feature = "global")]
pub mod global;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AsyncLogger, AsyncLoggerBuilder, LoggerError, LoggerMetrics, LoggerState,
        OverflowCallback, OverflowPolicy, Result, SinkConfig,
    };
    pub use crate::dispatcher::Dispatcher;
    pub use crate::sinks::{SharedBuffer, StderrSink, StdoutSink};
}

pub use core::{
    AsyncLogger, AsyncLoggerBuilder, LoggerError, LoggerMetrics, LoggerState, OverflowCallback,
    OverflowPolicy, Result, SinkConfig,
};
pub use dispatcher::Dispatcher;
pub use sinks::{SharedBuffer, StderrSink, StdoutSink};

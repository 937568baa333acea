//! Core sink types: the logger, its consumer loop and supporting pieces

pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod state;
pub mod writer;

pub use config::{
    SinkConfig, DEFAULT_BUFFER_SIZE, DEFAULT_DISPATCH_CAPACITY, DEFAULT_RECORDS_COUNT,
};
pub use error::{LoggerError, Result};
pub use logger::{AsyncLogger, AsyncLoggerBuilder, DRAIN_POLL_INTERVAL};
pub use metrics::LoggerMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use state::{ActivityGate, LoggerState};
pub use writer::{BufferedWriter, WriteOutcome};

//! Sink configuration

use super::error::{LoggerError, Result};
use super::overflow_policy::OverflowPolicy;
use serde::{Deserialize, Serialize};

/// Default queue-depth hint
pub const DEFAULT_RECORDS_COUNT: usize = 16;

/// Default capacity of the buffered writer in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default capacity of the dispatcher queue
pub const DEFAULT_DISPATCH_CAPACITY: usize = 1024;

/// Configuration accepted at construction or initialization
///
/// `records_count` is a queue-depth hint only: the handoff between
/// producers and the consumer loop is always a rendezvous, so the value is
/// stored and reported but does not change backpressure behavior.
///
/// # Example
///
/// ```
/// use async_log_sink::SinkConfig;
///
/// let config = SinkConfig::from_json(r#"{ "buffer_size": 4096 }"#).unwrap();
/// assert_eq!(config.buffer_size, 4096);
/// assert_eq!(config.records_count, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Queue-depth hint (no effect on the rendezvous handoff)
    pub records_count: usize,

    /// Byte capacity of the buffered writer
    pub buffer_size: usize,

    /// Capacity of the dispatcher queue
    pub dispatch_capacity: usize,

    /// What the dispatcher does with records submitted while its queue is full
    pub overflow_policy: OverflowPolicy,
}

impl SinkConfig {
    pub fn new(records_count: usize, buffer_size: usize) -> Self {
        Self {
            records_count,
            buffer_size,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON, filling omitted fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SinkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(LoggerError::config(
                "SinkConfig",
                "buffer_size must be non-zero",
            ));
        }
        if self.dispatch_capacity == 0 {
            return Err(LoggerError::config(
                "SinkConfig",
                "dispatch_capacity must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            records_count: DEFAULT_RECORDS_COUNT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

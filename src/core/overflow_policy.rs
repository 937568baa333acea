//! Overflow policies for the dispatcher queue
//!
//! The consumer loop itself never buffers: producers block on the
//! rendezvous handoff. The [`Dispatcher`](crate::dispatcher::Dispatcher)
//! sits in front of that handoff with a bounded queue, and these policies
//! decide what happens to a record submitted while the queue is full.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What a full dispatcher queue does with a newly submitted record
///
/// ```
/// use async_log_sink::OverflowPolicy;
/// use std::time::Duration;
///
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::AlertAndDrop);
/// assert!(OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).may_block());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Refuse the new record; only the drop counter notices
    DropNewest,

    /// Evict the longest-queued record and accept the new one
    DropOldest,

    /// Wait for room. Never returns while no consumer loop is running.
    Block,

    /// Wait for room up to the given duration, then refuse the record
    BlockWithTimeout(Duration),

    /// Refuse the new record and report it on stderr and to the callback
    #[default]
    AlertAndDrop,
}

impl OverflowPolicy {
    /// Whether a submitter may be held up by a full queue
    pub fn may_block(&self) -> bool {
        matches!(self, Self::Block | Self::BlockWithTimeout(_))
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropNewest => f.write_str("DropNewest"),
            Self::DropOldest => f.write_str("DropOldest"),
            Self::Block => f.write_str("Block"),
            Self::BlockWithTimeout(timeout) => write!(f, "BlockWithTimeout({:?})", timeout),
            Self::AlertAndDrop => f.write_str("AlertAndDrop"),
        }
    }
}

/// Notified with the running total of dropped records
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        let policy = OverflowPolicy::default();
        assert_eq!(policy, OverflowPolicy::AlertAndDrop);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "BlockWithTimeout(100ms)"
        );
        assert_eq!(OverflowPolicy::AlertAndDrop.to_string(), "AlertAndDrop");
    }

    #[test]
    fn test_only_blocking_policies_may_block() {
        assert!(OverflowPolicy::Block.may_block());
        assert!(!OverflowPolicy::DropOldest.may_block());
        assert!(!OverflowPolicy::AlertAndDrop.may_block());
    }

    #[test]
    fn test_overflow_policy_json() {
        let json = serde_json::to_string(&OverflowPolicy::Block).unwrap();
        let parsed: OverflowPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, OverflowPolicy::Block);
    }
}

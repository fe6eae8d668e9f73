//! Overflow policies for the dispatch queue
//!
//! When the bounded dispatch queue is full, the policy decides what happens
//! to the event a caller is trying to log.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full dispatch queue
///
/// # Example
///
/// ```
/// use fanout_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: alert and drop
/// let policy = OverflowPolicy::default();
///
/// // Block with timeout
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the new event; only the metrics record it
    DropNewest,

    /// Evict the oldest queued event to make room for the new one
    DropOldest,

    /// Block the caller until space is available
    ///
    /// Every log call inherits the latency of the slowest dispatch step.
    Block,

    /// Block up to the given duration, then drop with an alert
    BlockWithTimeout(Duration),

    /// Drop the new event, alert on stderr and through the overflow callback
    #[default]
    AlertAndDrop,
}

impl OverflowPolicy {
    /// Whether a caller may be suspended by this policy
    pub fn may_block(&self) -> bool {
        matches!(
            self,
            OverflowPolicy::Block | OverflowPolicy::BlockWithTimeout(_)
        )
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when events are dropped because the dispatch queue is full.
/// The parameter is the total count of dropped events so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Alert on the first drop and every thousandth one after it
#[inline]
pub(crate) fn should_alert(total_dropped: u64) -> bool {
    total_dropped == 1 || total_dropped % 1000 == 0
}

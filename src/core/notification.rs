//! Provider signals
//!
//! Providers report what happened to their events after the fact: status
//! transitions, recoverable errors, critical errors and events that could
//! not be logged. Observers either register callbacks on a provider or read
//! the channel returned by [`crate::Logger::notifications`].

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Capacity of each notification channel; overflow is dropped
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    StatusChanged,
    Error,
    CriticalError,
    FailToLog,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationKind::StatusChanged => "StatusChanged",
            NotificationKind::Error => "Error",
            NotificationKind::CriticalError => "CriticalError",
            NotificationKind::FailToLog => "FailToLog",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderNotification {
    pub kind: NotificationKind,
    pub provider: String,
    pub message: String,
}

impl ProviderNotification {
    pub fn new(kind: NotificationKind, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "[{}] {}", self.provider, self.kind)
        } else {
            write!(f, "[{}] {}: {}", self.provider, self.kind, self.message)
        }
    }
}

/// Callback type for provider signals
pub type NotificationCallback = Arc<dyn Fn(&ProviderNotification) + Send + Sync>;

/// Fan-out of notifications to channel subscribers
///
/// Subscribers whose receiver was dropped are pruned on the next publish.
#[derive(Default)]
pub(crate) struct NotificationHub {
    senders: Mutex<Vec<Sender<ProviderNotification>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ProviderNotification> {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        self.senders.lock().push(sender);
        receiver
    }

    pub fn publish(&self, notification: &ProviderNotification) {
        self.senders
            .lock()
            .retain(|sender| match sender.try_send(notification.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

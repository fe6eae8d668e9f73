//! In-process events provider
//!
//! Delivers each event to callbacks registered on an [`EventHub`] and to
//! every channel obtained from [`EventHub::subscribe`]. The hub belongs to
//! the provider and survives sink rebuilds, so handlers registered once keep
//! receiving events across disable/enable and re-registration.

use crate::core::{EventKind, LineStyle, LogEvent, ProviderProperties, ProviderSink, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// Default capacity of a subscription channel
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 4096;

/// What an events subscriber receives
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredEvent {
    pub kind: EventKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// The event rendered with the provider's line style
    pub line: String,
}

pub type EventHandler = Arc<dyn Fn(&DeliveredEvent) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    handlers: RwLock<Vec<(Option<EventKind>, EventHandler)>>,
    channels: Mutex<Vec<Sender<DeliveredEvent>>>,
}

/// Handler registry shared between an events provider and its observers
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every delivered event
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&DeliveredEvent) + Send + Sync + 'static,
    {
        self.inner.handlers.write().push((None, Arc::new(handler)));
    }

    /// Call `handler` for delivered events of one kind
    pub fn on_kind<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&DeliveredEvent) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .push((Some(kind), Arc::new(handler)));
    }

    /// Channel of delivered events; drop the receiver to unsubscribe
    ///
    /// Holds up to [`DEFAULT_SUBSCRIBER_CAPACITY`] undrained events; newer
    /// events are dropped for this subscriber until it catches up.
    pub fn subscribe(&self) -> Receiver<DeliveredEvent> {
        self.subscribe_with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> Receiver<DeliveredEvent> {
        let (sender, receiver) = bounded(capacity.max(1));
        self.inner.channels.lock().push(sender);
        receiver
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    pub(crate) fn publish(&self, event: &DeliveredEvent) {
        let handlers = self.inner.handlers.read().clone();
        for (kind, handler) in handlers {
            if kind.map_or(true, |k| k == event.kind) {
                handler(event);
            }
        }

        self.inner
            .channels
            .lock()
            .retain(|sender| match sender.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("handlers", &self.handler_count())
            .field("channels", &self.inner.channels.lock().len())
            .finish()
    }
}

pub struct EventsSink {
    hub: EventHub,
    style: LineStyle,
}

impl EventsSink {
    pub fn new(hub: EventHub, style: LineStyle) -> Self {
        Self { hub, style }
    }

    pub fn from_properties(properties: &ProviderProperties, hub: EventHub) -> Result<Self> {
        Ok(Self::new(hub, LineStyle::from_properties(properties)))
    }
}

impl ProviderSink for EventsSink {
    fn emit(&mut self, event: &LogEvent) -> Result<()> {
        let delivered = DeliveredEvent {
            kind: event.kind,
            message: event.message.clone(),
            timestamp: event.timestamp,
            line: self.style.render(event),
        };
        self.hub.publish(&delivered);
        Ok(())
    }

    fn name(&self) -> &str {
        "events"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_handlers_and_channels_receive_events() {
        let hub = EventHub::new();
        let all = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        {
            let all = Arc::clone(&all);
            hub.on_event(move |_| {
                all.fetch_add(1, Ordering::Relaxed);
            });
            let errors = Arc::clone(&errors);
            hub.on_kind(EventKind::Error, move |_| {
                errors.fetch_add(1, Ordering::Relaxed);
            });
        }
        let receiver = hub.subscribe();

        let mut sink = EventsSink::new(hub.clone(), LineStyle::default());
        sink.emit(&LogEvent::new(EventKind::Info, "first")).unwrap();
        sink.emit(&LogEvent::new(EventKind::Error, "second")).unwrap();

        assert_eq!(all.load(Ordering::Relaxed), 2);
        assert_eq!(errors.load(Ordering::Relaxed), 1);

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.message, "first");
        assert!(first.line.ends_with("[INFO] first"));
        assert_eq!(receiver.try_recv().unwrap().kind, EventKind::Error);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let hub = EventHub::new();
        drop(hub.subscribe());

        let mut sink = EventsSink::new(hub.clone(), LineStyle::default());
        sink.emit(&LogEvent::new(EventKind::Info, "x")).unwrap();

        assert!(hub.inner.channels.lock().is_empty());
    }

    #[test]
    fn test_slow_subscriber_is_bounded() {
        let hub = EventHub::new();
        let stalled = hub.subscribe_with_capacity(4);
        let live = hub.subscribe();

        let mut sink = EventsSink::new(hub.clone(), LineStyle::default());
        for i in 0..10 {
            sink.emit(&LogEvent::new(EventKind::Info, format!("{}", i)))
                .unwrap();
        }

        assert_eq!(stalled.len(), 4);
        let kept: Vec<String> = stalled.try_iter().map(|e| e.message).collect();
        assert_eq!(kept, vec!["0", "1", "2", "3"]);
        assert_eq!(live.try_iter().count(), 10);
        assert_eq!(hub.inner.channels.lock().len(), 2);
    }
}

//! Provider handle and worker
//!
//! A [`LogProvider`] owns one sink and everything around it: identity,
//! properties, the enabled flag, status, signals and the failure policy.
//! Once registered with a [`crate::Logger`] it gets a worker thread that
//! drains the provider's own FIFO queue; the sink is only touched there.

use super::error::{LoggerError, Result};
use super::event_kind::{EventKind, LevelFilter};
use super::log_event::LogEvent;
use super::notification::{
    NotificationCallback, NotificationHub, NotificationKind, ProviderNotification,
};
use super::properties::{keys, ProviderProperties, ProviderType};
use super::retry::{sleep_unless, RetryPolicy};
use super::sink::{ProviderSink, SinkFactory};
use crate::providers::{self, EventHub};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderStatus {
    /// Not yet delivered anything, or sink released
    Idle,
    /// Sink is being opened
    Initializing,
    Running,
    Disabled,
    /// Removed from its logger
    Stopped,
    /// Auto-disabled after a fault
    Failed,
}

impl ProviderStatus {
    pub fn to_str(&self) -> &'static str {
        match self {
            ProviderStatus::Idle => "Idle",
            ProviderStatus::Initializing => "Initializing",
            ProviderStatus::Running => "Running",
            ProviderStatus::Disabled => "Disabled",
            ProviderStatus::Stopped => "Stopped",
            ProviderStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// What a provider does when its sink fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Raise `CriticalError` and `FailToLog`, then disable the provider
    /// and release its sink
    DisableOnFault,
    /// Raise `Error` once per event and retry; `FailToLog` when exhausted
    Retry(RetryPolicy),
}

/// Messages on a provider queue
pub(crate) enum ProviderMessage {
    Event(Arc<LogEvent>),
    /// Flush the sink, then acknowledge
    Flush(Sender<()>),
}

struct ProviderShared {
    properties: ProviderProperties,
    filter: LevelFilter,
    factory: SinkFactory,
    failure_policy: FailurePolicy,
    max_fails_to_stop: u64,
    event_hub: Option<EventHub>,

    enabled: AtomicBool,
    registered: AtomicBool,
    abandoned: AtomicBool,
    status: RwLock<ProviderStatus>,
    last_error: RwLock<Option<String>>,
    /// Locked only by the worker; mirrored in `sink_open` for readers
    sink: Mutex<Option<Box<dyn ProviderSink>>>,
    sink_open: AtomicBool,

    subscribers: RwLock<Vec<NotificationCallback>>,
    relay: RwLock<Option<Arc<NotificationHub>>>,

    delivered: AtomicU64,
    failed: AtomicU64,
    consecutive_failures: AtomicU64,
}

/// Handle to one output provider; clones share the same provider
#[derive(Clone)]
pub struct LogProvider {
    shared: Arc<ProviderShared>,
}

impl LogProvider {
    /// Create a built-in provider, checking required options up front
    ///
    /// # Example
    ///
    /// ```
    /// use fanout_logger::{LogProvider, ProviderProperties, ProviderType};
    ///
    /// let props = ProviderProperties::new("redis", ProviderType::Redis);
    /// // Host and Port are required
    /// assert!(LogProvider::new(props).is_err());
    /// ```
    pub fn new(properties: ProviderProperties) -> Result<Self> {
        providers::validate(&properties)?;
        Ok(Self::lazy(properties))
    }

    /// Create a built-in provider whose configuration is only checked when
    /// the first event reaches it
    ///
    /// A configuration fault then raises `CriticalError` and `FailToLog`
    /// and disables the provider.
    pub fn lazy(properties: ProviderProperties) -> Self {
        let binding = providers::bind(&properties);
        Self::from_parts(
            properties,
            binding.factory,
            binding.failure_policy,
            binding.event_hub,
        )
    }

    /// Create a provider around a user-supplied sink
    pub fn with_sink_factory(properties: ProviderProperties, factory: SinkFactory) -> Self {
        Self::custom(properties, factory, FailurePolicy::DisableOnFault)
    }

    pub fn custom(
        properties: ProviderProperties,
        factory: SinkFactory,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self::from_parts(properties, factory, failure_policy, None)
    }

    fn from_parts(
        properties: ProviderProperties,
        factory: SinkFactory,
        failure_policy: FailurePolicy,
        event_hub: Option<EventHub>,
    ) -> Self {
        let enabled = properties.flag(keys::ENABLED);
        Self {
            shared: Arc::new(ProviderShared {
                filter: properties.level_filter(),
                max_fails_to_stop: properties.count(keys::MAX_FAILS_TO_STOP).unwrap_or(0),
                properties,
                factory,
                failure_policy,
                event_hub,
                enabled: AtomicBool::new(enabled),
                registered: AtomicBool::new(false),
                abandoned: AtomicBool::new(false),
                status: RwLock::new(ProviderStatus::Idle),
                last_error: RwLock::new(None),
                sink: Mutex::new(None),
                sink_open: AtomicBool::new(false),
                subscribers: RwLock::new(Vec::new()),
                relay: RwLock::new(None),
                delivered: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                consecutive_failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.properties.name()
    }

    pub fn provider_type(&self) -> &ProviderType {
        self.shared.properties.provider_type()
    }

    pub fn properties(&self) -> &ProviderProperties {
        &self.shared.properties
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.shared.filter
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.shared.failure_policy
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    pub fn is_registered(&self) -> bool {
        self.shared.registered.load(Ordering::Acquire)
    }

    pub fn status(&self) -> ProviderStatus {
        *self.shared.status.read()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.read().clone()
    }

    /// Events the sink accepted
    pub fn delivered_count(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Events that raised `FailToLog`
    pub fn failed_count(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    /// In-process event hub of an Events provider
    pub fn event_hub(&self) -> Option<&EventHub> {
        self.shared.event_hub.as_ref()
    }

    /// Whether both handles refer to the same provider
    pub fn ptr_eq(&self, other: &LogProvider) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Subscribe to every signal this provider raises
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&ProviderNotification) + Send + Sync + 'static,
    {
        self.shared.subscribers.write().push(Arc::new(callback));
    }

    fn subscribe_kind<F>(&self, kind: NotificationKind, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(move |n| {
            if n.kind == kind {
                callback(&n.message)
            }
        });
    }

    /// Called with the new status name on every transition
    pub fn on_status_changed<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe_kind(NotificationKind::StatusChanged, callback);
    }

    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe_kind(NotificationKind::Error, callback);
    }

    pub fn on_critical_error<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe_kind(NotificationKind::CriticalError, callback);
    }

    pub fn on_fail_to_log<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_kind(NotificationKind::FailToLog, move |_| callback());
    }

    // ---- logger-facing half ----

    /// Claim the provider for a logger; false if another logger owns it
    pub(crate) fn try_register(&self, relay: Arc<NotificationHub>) -> bool {
        if self
            .shared
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.shared.abandoned.store(false, Ordering::Release);
        *self.shared.relay.write() = Some(relay);
        self.set_enabled(true);
        true
    }

    /// Give up on events still queued for this provider
    pub(crate) fn abandon(&self) {
        self.shared.abandoned.store(true, Ordering::Release);
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Release);
        if enabled {
            let reopened = if self.shared.sink_open.load(Ordering::Acquire) {
                ProviderStatus::Running
            } else {
                ProviderStatus::Idle
            };
            self.set_status(reopened);
        } else {
            self.set_status(ProviderStatus::Disabled);
        }
    }

    /// Whether the dispatcher should hand `kind` to this provider
    #[inline]
    pub(crate) fn accepts(&self, kind: EventKind) -> bool {
        self.is_enabled() && self.shared.filter.accepts(kind)
    }

    /// Record an event the dispatcher could not queue for this provider
    pub(crate) fn report_overflow(&self) {
        self.shared.failed.fetch_add(1, Ordering::Relaxed);
        self.notify(NotificationKind::FailToLog, "provider queue full, event dropped");
    }

    /// Worker loop: drain the queue until every sender is gone, flushing
    /// the sink whenever the queue runs empty
    pub(crate) fn run_worker(&self, receiver: Receiver<ProviderMessage>) {
        let mut dirty = false;
        loop {
            let message = match receiver.try_recv() {
                Ok(message) => message,
                Err(TryRecvError::Empty) => {
                    if dirty {
                        self.flush_sink();
                        dirty = false;
                    }
                    match receiver.recv() {
                        Ok(message) => message,
                        Err(_) => break,
                    }
                }
                Err(TryRecvError::Disconnected) => break,
            };

            match message {
                ProviderMessage::Event(event) => {
                    self.deliver(&event);
                    dirty = true;
                }
                ProviderMessage::Flush(ack) => {
                    self.flush_sink();
                    dirty = false;
                    let _ = ack.send(());
                }
            }
        }

        self.release_sink();
        if self.status() != ProviderStatus::Failed {
            self.set_status(ProviderStatus::Stopped);
        }
        self.unregister();
    }

    /// Detach from the owning logger; also undoes `try_register` when the
    /// worker could not be started
    pub(crate) fn unregister(&self) {
        *self.shared.relay.write() = None;
        self.shared.registered.store(false, Ordering::Release);
    }

    fn deliver(&self, event: &LogEvent) {
        if self.shared.abandoned.load(Ordering::Acquire) {
            self.fail_to_log("provider removed before the event was delivered");
            return;
        }
        if self.status() == ProviderStatus::Failed {
            self.fail_to_log("provider is disabled after a fault");
            return;
        }

        match self.shared.failure_policy {
            FailurePolicy::DisableOnFault => match self.attempt(event) {
                Ok(()) => self.record_delivered(),
                Err(e) => self.fault(&e),
            },
            FailurePolicy::Retry(policy) => self.deliver_with_retry(event, &policy),
        }
    }

    fn deliver_with_retry(&self, event: &LogEvent, policy: &RetryPolicy) {
        let attempts = policy.attempts();
        let mut made = 0;
        while made < attempts {
            made += 1;
            match self.attempt(event) {
                Ok(()) => {
                    self.record_delivered();
                    return;
                }
                Err(e) if e.is_unrecoverable() => {
                    self.fault(&e);
                    return;
                }
                Err(e) => {
                    if made == 1 {
                        self.record_error(&e);
                        self.notify(NotificationKind::Error, e.to_string());
                    }
                    if made < attempts
                        && !sleep_unless(&self.shared.abandoned, policy.delay_for(made))
                    {
                        break;
                    }
                }
            }
        }

        self.fail_to_log(LoggerError::exhausted(self.name(), made).to_string());

        let consecutive = self.shared.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        let limit = self.shared.max_fails_to_stop;
        if limit > 0 && consecutive >= limit {
            let e = LoggerError::fault(
                self.name(),
                format!("stopped after {} consecutive undelivered events", consecutive),
            );
            self.record_error(&e);
            self.notify(NotificationKind::CriticalError, e.to_string());
            self.auto_disable();
        }
    }

    /// One emit, opening the sink first if needed
    ///
    /// Status signals are raised with the sink unlocked.
    fn attempt(&self, event: &LogEvent) -> Result<()> {
        if !self.shared.sink_open.load(Ordering::Acquire) {
            self.open_sink()?;
        }

        let mut slot = self.shared.sink.lock();
        let Some(sink) = slot.as_mut() else {
            return Err(LoggerError::fault(self.name(), "sink unavailable"));
        };
        match catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
            Ok(result) => result,
            Err(panic) => {
                // State unknown after a panic; rebuild on next use
                *slot = None;
                self.shared.sink_open.store(false, Ordering::Release);
                drop(slot);
                eprintln!(
                    "[LOGGER CRITICAL] Provider '{}' panicked while emitting. \
                     Other providers continue to function.",
                    self.name()
                );
                Err(LoggerError::fault(
                    self.name(),
                    format!("sink panicked: {}", panic_message(&*panic)),
                ))
            }
        }
    }

    fn open_sink(&self) -> Result<()> {
        self.set_status(ProviderStatus::Initializing);
        let factory = Arc::clone(&self.shared.factory);
        let properties = &self.shared.properties;
        let built = catch_unwind(AssertUnwindSafe(|| factory(properties))).unwrap_or_else(|panic| {
            Err(LoggerError::fault(
                self.name(),
                format!("sink construction panicked: {}", panic_message(&*panic)),
            ))
        });
        match built {
            Ok(sink) => {
                *self.shared.sink.lock() = Some(sink);
                self.shared.sink_open.store(true, Ordering::Release);
                if self.is_enabled() {
                    self.set_status(ProviderStatus::Running);
                }
                Ok(())
            }
            Err(e) => {
                self.set_status(ProviderStatus::Idle);
                Err(e)
            }
        }
    }

    fn record_delivered(&self) {
        self.shared.delivered.fetch_add(1, Ordering::Relaxed);
        self.shared.consecutive_failures.store(0, Ordering::Release);
    }

    fn record_error(&self, error: &LoggerError) {
        *self.shared.last_error.write() = Some(error.to_string());
    }

    fn fail_to_log(&self, reason: impl Into<String>) {
        self.shared.failed.fetch_add(1, Ordering::Relaxed);
        self.notify(NotificationKind::FailToLog, reason);
    }

    /// Critical path: signal, then take the provider out of service
    fn fault(&self, error: &LoggerError) {
        self.record_error(error);
        self.notify(NotificationKind::CriticalError, error.to_string());
        self.fail_to_log(error.to_string());
        self.auto_disable();
    }

    fn auto_disable(&self) {
        self.shared.enabled.store(false, Ordering::Release);
        self.release_sink();
        self.set_status(ProviderStatus::Failed);
    }

    fn flush_sink(&self) {
        let mut slot = self.shared.sink.lock();
        let Some(sink) = slot.as_mut() else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                drop(slot);
                self.record_error(&e);
                self.notify(NotificationKind::Error, format!("flush failed: {}", e));
            }
            Err(panic) => {
                *slot = None;
                self.shared.sink_open.store(false, Ordering::Release);
                drop(slot);
                eprintln!(
                    "[LOGGER CRITICAL] Provider '{}' panicked during flush: {}",
                    self.name(),
                    panic_message(&*panic)
                );
            }
        }
    }

    /// Close and drop the sink; the next event reopens it
    fn release_sink(&self) {
        let Some(mut sink) = self.shared.sink.lock().take() else {
            return;
        };
        self.shared.sink_open.store(false, Ordering::Release);
        match catch_unwind(AssertUnwindSafe(|| sink.close())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.record_error(&e);
                self.notify(NotificationKind::Error, format!("close failed: {}", e));
            }
            Err(panic) => eprintln!(
                "[LOGGER CRITICAL] Provider '{}' panicked while closing: {}",
                self.name(),
                panic_message(&*panic)
            ),
        }
    }

    fn set_status(&self, status: ProviderStatus) {
        {
            let mut current = self.shared.status.write();
            if *current == status {
                return;
            }
            *current = status;
        }
        self.notify(NotificationKind::StatusChanged, status.to_str());
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = ProviderNotification::new(kind, self.name(), message);

        let subscribers = self.shared.subscribers.read().clone();
        for callback in subscribers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(&notification))) {
                eprintln!(
                    "[LOGGER ERROR] Signal subscriber of provider '{}' panicked: {}",
                    self.name(),
                    panic_message(&*panic)
                );
            }
        }

        let relay = self.shared.relay.read().clone();
        if let Some(hub) = relay {
            hub.publish(&notification);
        }
    }
}

impl fmt::Debug for LogProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogProvider")
            .field("name", &self.name())
            .field("type", self.provider_type())
            .field("enabled", &self.is_enabled())
            .field("status", &self.status())
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

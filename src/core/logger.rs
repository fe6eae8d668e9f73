//! Dispatcher: registry, dispatch queue and provider workers
//!
//! Callers only ever touch the bounded dispatch queue. A single dispatch
//! worker pops events in FIFO order and hands each one to the queue of every
//! registered provider that is enabled and whose filter accepts the event
//! kind. Every provider drains its own queue on its own worker thread, so a
//! slow sink delays nobody but itself.

use super::{
    config::{ConfigManager, ProviderDefinition},
    error::{LoggerError, Result},
    event_kind::EventKind,
    log_context::LogContext,
    log_event::LogEvent,
    metrics::LoggerMetrics,
    notification::{NotificationHub, ProviderNotification},
    overflow_policy::{should_alert, OverflowCallback, OverflowPolicy},
    properties::ProviderType,
    provider::{LogProvider, ProviderMessage},
};
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default drain window for provider removal and logger disposal
///
/// Used when the logger is dropped without an explicit [`Logger::dispose`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_PROVIDER_QUEUE_CAPACITY: usize = 1024;

/// Crate name and version, as reported by [`Logger::name_and_version`]
pub const NAME_AND_VERSION: &str = concat!("fanout_logger ", env!("CARGO_PKG_VERSION"));

const JOIN_POLL: Duration = Duration::from_millis(10);
const EVICTION_ATTEMPTS: usize = 3;

/// Messages on the dispatch queue
enum Dispatch {
    /// An event and its log-call sequence number
    Event(u64, Arc<LogEvent>),
    /// Acknowledged once everything queued before it has been fanned out
    Sync(Sender<()>),
}

/// A provider as seen by one logger
struct Registration {
    provider: LogProvider,
    /// Events with a lower sequence number are never handed over; moved
    /// forward on registration and on every re-enable
    since: AtomicU64,
    /// Taken on removal, which closes the provider queue
    sender: Mutex<Option<Sender<ProviderMessage>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Registration {
    fn sender(&self) -> Option<Sender<ProviderMessage>> {
        self.sender.lock().clone()
    }

    /// Whether the caller is this provider's worker, i.e. a signal handler
    fn on_worker_thread(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Hand an event to the provider queue without blocking the dispatcher
    fn offer(&self, sequence: u64, event: &Arc<LogEvent>, metrics: &LoggerMetrics) {
        if sequence < self.since.load(Ordering::Acquire) || !self.provider.accepts(event.kind) {
            return;
        }
        let overflowed = match self.sender.lock().as_ref() {
            Some(sender) => matches!(
                sender.try_send(ProviderMessage::Event(Arc::clone(event))),
                Err(TrySendError::Full(_))
            ),
            None => false,
        };
        if overflowed {
            metrics.record_provider_overflow();
            self.provider.report_overflow();
        }
    }
}

type Registry = Arc<RwLock<Arc<Vec<Arc<Registration>>>>>;

/// Dispatcher settings, see [`LoggerBuilder`]
#[derive(Clone)]
struct DispatchConfig {
    queue_capacity: usize,
    provider_queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    drain_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            provider_queue_capacity: DEFAULT_PROVIDER_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
            drain_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Multi-provider logging dispatcher
///
/// Share it between threads behind an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use fanout_logger::{EventKind, Logger, LogProvider, ProviderProperties, ProviderType};
///
/// let logger = Logger::new();
/// let events = LogProvider::new(ProviderProperties::new("events", ProviderType::Events))?;
/// let received = events.event_hub().unwrap().subscribe();
///
/// logger.add_provider(&events)?;
/// logger.info("service started");
/// logger.flush()?;
///
/// assert_eq!(received.try_recv().unwrap().kind, EventKind::Info);
/// # Ok::<(), fanout_logger::LoggerError>(())
/// ```
pub struct Logger {
    sender: RwLock<Option<Sender<Dispatch>>>,
    /// Receiver clone used by `DropOldest` to evict the head of the queue
    evictor: Option<Receiver<Dispatch>>,
    dispatch_handle: Mutex<Option<thread::JoinHandle<()>>>,
    registry: Registry,
    sequence: AtomicU64,
    metrics: Arc<LoggerMetrics>,
    notifications: Arc<NotificationHub>,
    config: DispatchConfig,
    disposed: AtomicBool,
}

impl Logger {
    /// Logger with default queue sizes and overflow policy
    #[must_use]
    pub fn new() -> Self {
        Self::start(DispatchConfig::default())
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn start(config: DispatchConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity);
        let evictor = matches!(config.overflow_policy, OverflowPolicy::DropOldest)
            .then(|| receiver.clone());

        let registry: Registry = Arc::new(RwLock::new(Arc::new(Vec::new())));
        let metrics = Arc::new(LoggerMetrics::new());

        let worker_registry = Arc::clone(&registry);
        let worker_metrics = Arc::clone(&metrics);
        let handle = thread::spawn(move || run_dispatch(receiver, worker_registry, worker_metrics));

        Self {
            sender: RwLock::new(Some(sender)),
            evictor,
            dispatch_handle: Mutex::new(Some(handle)),
            registry,
            sequence: AtomicU64::new(0),
            metrics,
            notifications: Arc::new(NotificationHub::new()),
            config,
            disposed: AtomicBool::new(false),
        }
    }

    /// `"fanout_logger <version>"`
    pub fn name_and_version(&self) -> &'static str {
        NAME_AND_VERSION
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Channel of every signal raised by a provider while registered here
    pub fn notifications(&self) -> Receiver<ProviderNotification> {
        self.notifications.subscribe()
    }

    // ---- registry ----

    /// Register a provider, enable it and start its worker
    ///
    /// The provider receives events logged from now on.
    pub fn add_provider(&self, provider: &LogProvider) -> Result<()> {
        if self.is_disposed() {
            return Err(LoggerError::LoggerDisposed);
        }

        let mut registry = self.registry.write();
        if registry.iter().any(|r| r.provider.name() == provider.name()) {
            return Err(LoggerError::duplicate_provider(provider.name()));
        }
        if !provider.try_register(Arc::clone(&self.notifications)) {
            return Err(LoggerError::already_registered(provider.name()));
        }

        let (sender, receiver) = bounded(self.config.provider_queue_capacity);
        let worker_provider = provider.clone();
        let worker = thread::Builder::new()
            .name(format!("fanout-provider-{}", provider.name()))
            .spawn(move || worker_provider.run_worker(receiver));
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                provider.unregister();
                return Err(LoggerError::io_operation(
                    "starting provider worker",
                    provider.name().to_string(),
                    e,
                ));
            }
        };

        let registration = Arc::new(Registration {
            provider: provider.clone(),
            since: AtomicU64::new(self.sequence.load(Ordering::Acquire)),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        });
        let mut next = registry.as_ref().clone();
        next.push(registration);
        *registry = Arc::new(next);
        Ok(())
    }

    /// Unregister a provider after draining what was logged before the call
    ///
    /// Events still queued for the provider when the drain window closes
    /// are abandoned; each raises `FailToLog`.
    pub fn remove_provider(&self, provider: &LogProvider) -> Result<()> {
        let deadline = Instant::now() + self.config.drain_timeout;
        self.find(provider)?;

        if !self.sync_dispatch(deadline) {
            eprintln!(
                "[LOGGER WARNING] Dispatch queue did not drain while removing provider '{}'",
                provider.name()
            );
        }

        let registration = {
            let mut registry = self.registry.write();
            let Some(index) = registry
                .iter()
                .position(|r| r.provider.ptr_eq(provider))
            else {
                return Err(LoggerError::provider_not_found(provider.name()));
            };
            let mut next = registry.as_ref().clone();
            let removed = next.remove(index);
            *registry = Arc::new(next);
            removed
        };

        retire(&registration, deadline);
        Ok(())
    }

    /// Resume deliveries to a provider; events logged while it was
    /// disabled are not replayed
    pub fn enable_provider(&self, provider: &LogProvider) -> Result<()> {
        let registration = self.find(provider)?;
        if !provider.is_enabled() {
            registration
                .since
                .store(self.sequence.load(Ordering::Acquire), Ordering::Release);
            provider.set_enabled(true);
        }
        Ok(())
    }

    /// Stop deliveries to a provider; it stays registered
    pub fn disable_provider(&self, provider: &LogProvider) -> Result<()> {
        self.find(provider)?;
        if provider.is_enabled() {
            provider.set_enabled(false);
        }
        Ok(())
    }

    fn find(&self, provider: &LogProvider) -> Result<Arc<Registration>> {
        self.registry
            .read()
            .iter()
            .find(|r| r.provider.ptr_eq(provider))
            .cloned()
            .ok_or_else(|| LoggerError::provider_not_found(provider.name()))
    }

    /// Registered providers, in registration order
    pub fn providers(&self) -> Vec<LogProvider> {
        self.registry
            .read()
            .iter()
            .map(|r| r.provider.clone())
            .collect()
    }

    pub fn provider(&self, name: &str) -> Option<LogProvider> {
        self.registry
            .read()
            .iter()
            .find(|r| r.provider.name() == name)
            .map(|r| r.provider.clone())
    }

    /// Definitions of the registered built-in providers, ready to be saved
    /// by a [`ConfigManager`]
    ///
    /// Custom providers are skipped; their sinks only exist in code.
    pub fn provider_definitions(&self) -> Vec<ProviderDefinition> {
        self.registry
            .read()
            .iter()
            .filter(|r| !matches!(r.provider.provider_type(), ProviderType::Custom(_)))
            .map(|r| ProviderDefinition::from_properties(r.provider.properties()))
            .collect()
    }

    /// Create and register every provider a configuration source defines
    ///
    /// All definitions are validated before the first one is registered.
    pub fn add_providers_from(&self, manager: &dyn ConfigManager) -> Result<Vec<LogProvider>> {
        let providers = manager
            .load()?
            .iter()
            .map(|definition| LogProvider::new(definition.to_properties()?))
            .collect::<Result<Vec<_>>>()?;

        for provider in &providers {
            self.add_provider(provider)?;
        }
        Ok(providers)
    }

    // ---- logging ----

    /// Queue an event; never blocks unless the overflow policy says so
    pub fn log(&self, kind: EventKind, message: impl Into<String>) {
        self.enqueue(LogEvent::new(kind, message));
    }

    /// Queue an event carrying structured fields
    pub fn log_with_context(&self, kind: EventKind, message: impl Into<String>, fields: LogContext) {
        self.enqueue(LogEvent::new(kind, message).with_fields(fields));
    }

    /// Queue an event, reporting a full queue instead of applying the
    /// overflow policy
    pub fn try_log(&self, kind: EventKind, message: impl Into<String>) -> Result<()> {
        let Some(sender) = self.sender.read().clone() else {
            return Err(LoggerError::LoggerDisposed);
        };
        let message = self.wrap(LogEvent::new(kind, message));
        match sender.try_send(message) {
            Ok(()) => {
                self.metrics.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_queue_full();
                Err(LoggerError::queue_full(sender.len(), self.config.queue_capacity))
            }
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::LoggerDisposed),
        }
    }

    fn wrap(&self, event: LogEvent) -> Dispatch {
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel);
        Dispatch::Event(sequence, Arc::new(event))
    }

    fn enqueue(&self, event: LogEvent) {
        let Some(sender) = self.sender.read().clone() else {
            self.report_disposed();
            return;
        };
        match sender.try_send(self.wrap(event)) {
            Ok(()) => {
                self.metrics.record_enqueued();
            }
            Err(TrySendError::Full(message)) => self.handle_overflow(&sender, message),
            Err(TrySendError::Disconnected(_)) => self.report_disposed(),
        }
    }

    /// Apply the overflow policy to an event the queue refused
    fn handle_overflow(&self, sender: &Sender<Dispatch>, message: Dispatch) {
        self.metrics.record_queue_full();

        match &self.config.overflow_policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
            }

            OverflowPolicy::DropOldest => self.evict_oldest(sender, message),

            OverflowPolicy::Block => {
                self.metrics.record_block();
                if sender.send(message).is_ok() {
                    self.metrics.record_enqueued();
                }
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(message, *timeout) {
                    Ok(()) => {
                        self.metrics.record_enqueued();
                    }
                    Err(SendTimeoutError::Timeout(_)) => self.alert_and_drop(),
                    Err(SendTimeoutError::Disconnected(_)) => self.report_disposed(),
                }
            }

            OverflowPolicy::AlertAndDrop => self.alert_and_drop(),
        }
    }

    /// Make room by evicting the oldest queued event
    ///
    /// Sync markers are never evicted; a popped marker is queued again.
    fn evict_oldest(&self, sender: &Sender<Dispatch>, mut message: Dispatch) {
        let Some(evictor) = self.evictor.as_ref() else {
            self.alert_and_drop();
            return;
        };

        for _ in 0..EVICTION_ATTEMPTS {
            match evictor.try_recv() {
                Ok(Dispatch::Event(..)) => {
                    self.metrics.record_evicted();
                }
                Ok(marker) => {
                    if sender.send(marker).is_err() {
                        return;
                    }
                }
                Err(_) => {}
            }
            match sender.try_send(message) {
                Ok(()) => {
                    self.metrics.record_enqueued();
                    return;
                }
                Err(TrySendError::Full(returned)) => message = returned,
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
        self.alert_and_drop();
    }

    fn alert_and_drop(&self) {
        let dropped = self.metrics.record_dropped();
        if should_alert(dropped) {
            eprintln!(
                "[LOGGER WARNING] Dispatch queue full, {} events dropped. \
                 Consider a larger queue capacity or a different overflow policy.",
                dropped
            );
            if let Some(ref callback) = self.config.on_overflow {
                callback(dropped);
            }
        }
    }

    fn report_disposed(&self) {
        let dropped = self.metrics.record_dropped();
        if should_alert(dropped) {
            eprintln!(
                "[LOGGER WARNING] Logger already disposed, {} events dropped",
                dropped
            );
        }
    }

    #[inline]
    pub fn header(&self, message: impl Into<String>) {
        self.log(EventKind::Header, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(EventKind::Info, message);
    }

    #[inline]
    pub fn success(&self, message: impl Into<String>) {
        self.log(EventKind::Success, message);
    }

    #[inline]
    pub fn done(&self, message: impl Into<String>) {
        self.log(EventKind::Done, message);
    }

    #[inline]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(EventKind::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(EventKind::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(EventKind::Critical, message);
    }

    #[inline]
    pub fn exception(&self, message: impl Into<String>) {
        self.log(EventKind::Exception, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(EventKind::Debug, message);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(EventKind::Trace, message);
    }

    #[inline]
    pub fn custom(&self, message: impl Into<String>) {
        self.log(EventKind::Custom, message);
    }

    // ---- draining ----

    fn on_dispatch_thread(&self) -> bool {
        self.dispatch_handle
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    /// Wait until everything queued so far has been fanned out
    fn sync_dispatch(&self, deadline: Instant) -> bool {
        let Some(sender) = self.sender.read().clone() else {
            return true;
        };
        // Overflow signals are raised on the dispatch thread itself
        if self.on_dispatch_thread() {
            return true;
        }
        let (ack, acked) = bounded(1);
        if sender.send_deadline(Dispatch::Sync(ack), deadline).is_err() {
            return false;
        }
        acked.recv_deadline(deadline).is_ok()
    }

    /// Wait until every event logged before the call has been emitted and
    /// every sink flushed
    pub fn flush(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(LoggerError::LoggerDisposed);
        }
        if self.flush_timeout(self.config.drain_timeout) {
            Ok(())
        } else {
            Err(LoggerError::other(format!(
                "flush did not complete within {:?}",
                self.config.drain_timeout
            )))
        }
    }

    /// [`Logger::flush`] with an explicit bound; false on timeout
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        if !self.sync_dispatch(deadline) {
            return false;
        }

        let registry = Arc::clone(&*self.registry.read());
        let mut pending = Vec::with_capacity(registry.len());
        for registration in registry.iter() {
            // A provider flushing from its own signal handler cannot ack itself
            if registration.on_worker_thread() {
                continue;
            }
            let Some(sender) = registration.sender() else {
                continue;
            };
            let (ack, acked) = bounded(1);
            match sender.send_deadline(ProviderMessage::Flush(ack), deadline) {
                Ok(()) => pending.push(acked),
                Err(SendTimeoutError::Timeout(_)) => return false,
                Err(SendTimeoutError::Disconnected(_)) => {}
            }
        }

        pending.iter().all(|acked| {
            !matches!(acked.recv_deadline(deadline), Err(RecvTimeoutError::Timeout))
        })
    }

    /// Drain and stop everything within `timeout`
    ///
    /// Returns false if some queue could not be drained in time; whatever
    /// was left is abandoned. A second call returns true immediately.
    pub fn dispose(&self, timeout: Duration) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return true;
        }
        let deadline = Instant::now() + timeout;

        // Closing the dispatch queue lets the worker drain it and exit
        drop(self.sender.write().take());
        let mut clean = match self.dispatch_handle.lock().take() {
            Some(handle) => join_until(handle, deadline, "dispatch worker"),
            None => true,
        };

        let registrations = std::mem::take(&mut *self.registry.write());
        for registration in registrations.iter() {
            clean &= retire(registration, deadline);
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger disposed with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
        clean
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.dispose(self.config.drain_timeout);
    }
}

fn run_dispatch(receiver: Receiver<Dispatch>, registry: Registry, metrics: Arc<LoggerMetrics>) {
    for message in receiver.iter() {
        match message {
            Dispatch::Event(sequence, event) => {
                let snapshot = Arc::clone(&*registry.read());
                for registration in snapshot.iter() {
                    registration.offer(sequence, &event, &metrics);
                }
            }
            Dispatch::Sync(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// Close a provider queue and wait for its worker to drain it
fn retire(registration: &Registration, deadline: Instant) -> bool {
    let provider = &registration.provider;
    drop(registration.sender.lock().take());

    let Some(handle) = registration.worker.lock().take() else {
        return true;
    };
    // A signal handler removing its own provider cannot wait for itself
    if handle.thread().id() == thread::current().id() {
        return true;
    }

    let finished = join_until(handle, deadline, provider.name());
    if !finished {
        provider.abandon();
        eprintln!(
            "[LOGGER WARNING] Provider '{}' did not drain in time; remaining events abandoned",
            provider.name()
        );
    }
    finished
}

/// Join a worker, giving up at `deadline`
fn join_until(handle: thread::JoinHandle<()>, deadline: Instant, what: &str) -> bool {
    loop {
        if handle.is_finished() {
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] {} panicked during shutdown: {:?}", what, e);
                return false;
            }
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(JOIN_POLL);
    }
}

/// Builder for constructing a [`Logger`] with a fluent API
///
/// # Example
/// ```
/// use fanout_logger::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let console = LogProvider::new(ProviderProperties::new("console", ProviderType::Console))?;
/// let logger = Logger::builder()
///     .queue_capacity(1000)
///     .overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)))
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} events dropped", count);
///     }))
///     .provider(console)
///     .build()?;
/// # Ok::<(), fanout_logger::LoggerError>(())
/// ```
#[derive(Default)]
pub struct LoggerBuilder {
    config: DispatchConfig,
    providers: Vec<LogProvider>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of the dispatch queue (default 10 000)
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Capacity of every provider queue (default 1024)
    #[must_use = "builder methods return a new value"]
    pub fn provider_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.provider_queue_capacity = capacity;
        self
    }

    /// What a log call does when the dispatch queue is full
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// Called with the total drop count on the first drop and every
    /// thousandth one after it
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.config.on_overflow = Some(callback);
        self
    }

    /// Drain window for provider removal, flush and drop
    #[must_use = "builder methods return a new value"]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.config.drain_timeout = timeout;
        self
    }

    /// Register a provider as soon as the logger starts
    #[must_use = "builder methods return a new value"]
    pub fn provider(mut self, provider: LogProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Result<Logger> {
        if self.config.queue_capacity == 0 {
            return Err(LoggerError::config("Logger", "queue capacity must be positive"));
        }
        if self.config.provider_queue_capacity == 0 {
            return Err(LoggerError::config(
                "Logger",
                "provider queue capacity must be positive",
            ));
        }

        let logger = Logger::start(self.config);
        for provider in &self.providers {
            logger.add_provider(provider)?;
        }
        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        FailurePolicy, LogEvent, ProviderProperties, ProviderSink, ProviderStatus,
    };
    use std::sync::atomic::AtomicUsize;

    /// Records every emitted message; optionally slow
    struct Collecting {
        lines: Arc<Mutex<Vec<String>>>,
        delay: Duration,
    }

    impl ProviderSink for Collecting {
        fn emit(&mut self, event: &LogEvent) -> Result<()> {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.lines.lock().push(event.message.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "collecting"
        }
    }

    fn collecting(name: &str, delay: Duration) -> (LogProvider, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let provider = LogProvider::custom(
            ProviderProperties::new(name, ProviderType::Custom("Collecting".into())),
            Arc::new(move |_: &ProviderProperties| {
                Ok(Box::new(Collecting {
                    lines: Arc::clone(&sink_lines),
                    delay,
                }) as Box<dyn ProviderSink>)
            }),
            FailurePolicy::DisableOnFault,
        );
        (provider, lines)
    }

    #[test]
    fn test_events_delivered_in_order() {
        let logger = Logger::new();
        let (provider, lines) = collecting("ordered", Duration::ZERO);
        logger.add_provider(&provider).unwrap();

        for i in 0..200 {
            logger.info(format!("event {}", i));
        }
        logger.flush().unwrap();

        let expected: Vec<String> = (0..200).map(|i| format!("event {}", i)).collect();
        assert_eq!(*lines.lock(), expected);
        assert_eq!(provider.delivered_count(), 200);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let logger = Logger::new();
        let (first, _) = collecting("same", Duration::ZERO);
        let (second, _) = collecting("same", Duration::ZERO);

        logger.add_provider(&first).unwrap();
        let err = logger.add_provider(&second).unwrap_err();

        assert!(matches!(err, LoggerError::DuplicateProviderName { .. }));
        assert_eq!(logger.providers().len(), 1);
        assert!(logger.providers()[0].ptr_eq(&first));
        assert!(!second.is_registered());
    }

    #[test]
    fn test_provider_owned_by_one_logger() {
        let first = Logger::new();
        let second = Logger::new();
        let (provider, _) = collecting("shared", Duration::ZERO);

        first.add_provider(&provider).unwrap();
        assert!(matches!(
            second.add_provider(&provider),
            Err(LoggerError::ProviderAlreadyRegistered { .. })
        ));

        first.remove_provider(&provider).unwrap();
        second.add_provider(&provider).unwrap();
    }

    #[test]
    fn test_disabled_events_are_not_replayed() {
        let logger = Logger::new();
        let (provider, lines) = collecting("toggle", Duration::ZERO);
        logger.add_provider(&provider).unwrap();

        logger.info("before");
        logger.flush().unwrap();
        logger.disable_provider(&provider).unwrap();
        for i in 0..50 {
            logger.info(format!("while disabled {}", i));
        }
        logger.enable_provider(&provider).unwrap();
        logger.info("after");
        logger.flush().unwrap();

        assert_eq!(*lines.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_remove_drains_before_release() {
        let logger = Logger::new();
        let (provider, lines) = collecting("slow", Duration::from_millis(2));
        logger.add_provider(&provider).unwrap();

        for i in 0..20 {
            logger.info(format!("{}", i));
        }
        logger.remove_provider(&provider).unwrap();

        assert_eq!(lines.lock().len(), 20);
        assert!(!provider.is_registered());
        assert_eq!(provider.status(), ProviderStatus::Stopped);
        assert!(matches!(
            logger.remove_provider(&provider),
            Err(LoggerError::ProviderNotFound { .. })
        ));
    }

    #[test]
    fn test_slow_provider_does_not_block_others() {
        let logger = Logger::new();
        let (slow, _) = collecting("slow", Duration::from_millis(50));
        let (fast, fast_lines) = collecting("fast", Duration::ZERO);
        logger.add_provider(&slow).unwrap();
        logger.add_provider(&fast).unwrap();

        let start = Instant::now();
        for i in 0..10 {
            logger.info(format!("{}", i));
        }
        assert!(start.elapsed() < Duration::from_millis(200));

        let deadline = Instant::now() + Duration::from_millis(300);
        while fast_lines.lock().len() < 10 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(fast_lines.lock().len(), 10);
    }

    #[test]
    fn test_provider_queue_overflow_is_isolated() {
        let logger = Logger::builder()
            .provider_queue_capacity(1)
            .build()
            .unwrap();
        let (slow, _) = collecting("slow", Duration::from_millis(20));
        let (fast, fast_lines) = collecting("fast", Duration::ZERO);
        let failures = Arc::new(AtomicUsize::new(0));
        {
            let failures = Arc::clone(&failures);
            slow.on_fail_to_log(move || {
                failures.fetch_add(1, Ordering::Relaxed);
            });
        }
        logger.add_provider(&slow).unwrap();
        logger.add_provider(&fast).unwrap();

        for i in 0..20 {
            logger.info(format!("{}", i));
        }
        assert!(logger.flush_timeout(Duration::from_secs(5)));

        assert!(logger.metrics().provider_overflows() > 0);
        assert!(failures.load(Ordering::Relaxed) > 0);
        assert!(fast_lines.lock().len() >= 1);
    }

    #[test]
    fn test_drop_newest_counts_drops() {
        let logger = Logger::builder()
            .queue_capacity(1)
            .overflow_policy(OverflowPolicy::DropNewest)
            .build()
            .unwrap();
        let (slow, _) = collecting("slow", Duration::from_millis(5));
        logger.add_provider(&slow).unwrap();

        for i in 0..200 {
            logger.debug(format!("{}", i));
        }

        let metrics = logger.metrics();
        assert_eq!(metrics.total_enqueued() + metrics.dropped_count(), 200);
    }

    #[test]
    fn test_drop_oldest_evicts() {
        let logger = Logger::builder()
            .queue_capacity(2)
            .overflow_policy(OverflowPolicy::DropOldest)
            .build()
            .unwrap();
        let (slow, lines) = collecting("slow", Duration::from_millis(1));
        logger.add_provider(&slow).unwrap();

        for i in 0..50 {
            logger.info(format!("{}", i));
        }
        assert!(logger.flush_timeout(Duration::from_secs(5)));

        let metrics = logger.metrics();
        assert_eq!(metrics.total_enqueued() + metrics.dropped_count(), 50);
        assert_eq!(
            lines.lock().len() as u64,
            metrics.total_enqueued() - metrics.evicted_count()
        );
        // The newest event always gets in
        assert_eq!(lines.lock().last().map(String::as_str), Some("49"));
    }

    #[test]
    fn test_alert_callback() {
        let alerts = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&alerts);
        let logger = Logger::builder()
            .queue_capacity(1)
            .overflow_policy(OverflowPolicy::AlertAndDrop)
            .on_overflow(Arc::new(move |total| {
                seen.store(total, Ordering::Relaxed);
            }))
            .build()
            .unwrap();
        let (slow, _) = collecting("slow", Duration::from_millis(20));
        logger.add_provider(&slow).unwrap();

        for i in 0..100 {
            logger.info(format!("{}", i));
        }
        if logger.metrics().dropped_count() > 0 {
            assert!(alerts.load(Ordering::Relaxed) >= 1);
        }
    }

    #[test]
    fn test_try_log_reports_disposed() {
        let logger = Logger::new();
        assert!(logger.try_log(EventKind::Info, "ok").is_ok());
        assert!(logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT));

        assert!(matches!(
            logger.try_log(EventKind::Info, "late"),
            Err(LoggerError::LoggerDisposed)
        ));
        logger.info("dropped quietly");
        assert!(matches!(logger.flush(), Err(LoggerError::LoggerDisposed)));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let logger = Logger::new();
        let (provider, lines) = collecting("p", Duration::ZERO);
        logger.add_provider(&provider).unwrap();
        logger.info("last words");

        assert!(logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT));
        let start = Instant::now();
        assert!(logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT));
        assert!(start.elapsed() < Duration::from_millis(100));

        assert_eq!(*lines.lock(), vec!["last words"]);
        assert!(logger.providers().is_empty());
        assert!(matches!(
            logger.add_provider(&provider),
            Err(LoggerError::LoggerDisposed)
        ));
    }

    #[test]
    fn test_name_and_version() {
        let logger = Logger::new();
        assert!(logger.name_and_version().starts_with("fanout_logger "));
        assert!(logger.name_and_version().len() > "fanout_logger ".len());
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        assert!(Logger::builder().queue_capacity(0).build().is_err());
        assert!(Logger::builder().provider_queue_capacity(0).build().is_err());
    }

    #[test]
    fn test_notifications_relayed() {
        let logger = Logger::new();
        let signals = logger.notifications();
        let (provider, _) = collecting("relay", Duration::ZERO);
        logger.add_provider(&provider).unwrap();
        logger.disable_provider(&provider).unwrap();

        let disabled = signals
            .recv_timeout(Duration::from_secs(1))
            .into_iter()
            .chain(signals.try_iter())
            .any(|n| n.provider == "relay" && n.message == "Disabled");
        assert!(disabled);
    }

    #[test]
    fn test_enable_does_not_wait_for_slow_emit() {
        let logger = Logger::new();
        let (provider, _) = collecting("sluggish", Duration::from_millis(1_000));
        logger.add_provider(&provider).unwrap();

        logger.info("takes a while");
        thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        logger.disable_provider(&provider).unwrap();
        logger.enable_provider(&provider).unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_millis(200), "toggling took {:?}", elapsed);
        assert!(provider.is_enabled());
    }

    #[test]
    fn test_status_subscriber_can_toggle_provider() {
        let logger = Arc::new(Logger::new());
        let (provider, lines) = collecting("reentrant", Duration::ZERO);
        let (done_tx, done_rx) = bounded(1);
        {
            let weak = Arc::downgrade(&logger);
            let handle = provider.clone();
            let once = AtomicBool::new(false);
            provider.on_status_changed(move |status| {
                if status != "Running" || once.swap(true, Ordering::AcqRel) {
                    return;
                }
                if let Some(logger) = weak.upgrade() {
                    logger.disable_provider(&handle).unwrap();
                    logger.enable_provider(&handle).unwrap();
                    let _ = done_tx.send(());
                }
            });
        }
        logger.add_provider(&provider).unwrap();

        logger.info("opens the sink");
        assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(logger.flush_timeout(Duration::from_secs(2)));
        assert_eq!(*lines.lock(), vec!["opens the sink"]);
        assert!(provider.is_enabled());
    }

    #[test]
    fn test_flush_from_own_signal_handler_returns_promptly() {
        let logger = Arc::new(Logger::new());
        let (provider, _) = collecting("self_flush", Duration::ZERO);
        let (result_tx, result_rx) = bounded(1);
        {
            let weak = Arc::downgrade(&logger);
            let once = AtomicBool::new(false);
            provider.on_status_changed(move |status| {
                if status != "Running" || once.swap(true, Ordering::AcqRel) {
                    return;
                }
                if let Some(logger) = weak.upgrade() {
                    let start = Instant::now();
                    let flushed = logger.flush_timeout(Duration::from_secs(3));
                    let _ = result_tx.send((flushed, start.elapsed()));
                }
            });
        }
        logger.add_provider(&provider).unwrap();

        logger.info("first");
        let (flushed, elapsed) = result_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(flushed);
        assert!(elapsed < Duration::from_secs(1), "flush took {:?}", elapsed);
    }
}

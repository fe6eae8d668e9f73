//! # fanout_logger
//!
//! A multi-provider logging dispatcher. Log calls from any thread are queued
//! and fanned out asynchronously to every registered provider: console,
//! file, SMTP, a Redis list, or an in-process event hub.
//!
//! ## Features
//!
//! - **Non-blocking callers**: a bounded dispatch queue with a configurable
//!   overflow policy
//! - **Isolated providers**: each provider drains its own queue on its own
//!   thread; one slow or failing sink does not hold up the others
//! - **Failure signals**: `Error`, `CriticalError`, `FailToLog` and status
//!   changes, per provider or through [`Logger::notifications`]
//! - **Drain before drop**: removing a provider or disposing the logger
//!   delivers what was already logged, within a bounded window
//!
//! ## Example
//!
//! ```no_run
//! use fanout_logger::prelude::*;
//!
//! let logger = Logger::new();
//!
//! let mut file = ProviderProperties::new("file", ProviderType::File);
//! file.set_provider_info([("FileName", "app.log")])?;
//! logger.add_provider(&LogProvider::new(file)?)?;
//!
//! logger.info("service started");
//! logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT);
//! # Ok::<(), fanout_logger::LoggerError>(())
//! ```
//!
//! ## Cargo features
//!
//! - `redis` (default): the Redis list provider
//! - `tls`: implicit TLS for the SMTP provider

pub mod core;
pub mod macros;
pub mod providers;

pub mod prelude {
    pub use crate::core::{
        keys, ConfigManager, EventKind, FailurePolicy, FieldValue, FileConfigManager,
        LevelFilter, LogContext, LogEvent, LogProvider, Logger, LoggerBuilder, LoggerError,
        LoggerMetrics, NotificationKind, OverflowCallback, OverflowPolicy, PropertyValue,
        ProviderDefinition, ProviderNotification, ProviderProperties, ProviderSink,
        ProviderStatus, ProviderType, Result, RetryPolicy, Strictness, TimestampFormat,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::providers::{DeliveredEvent, EventHub};
}

pub use core::{
    keys, to_json, ConfigManager, EventKind, FailurePolicy, FieldValue, FileConfigManager,
    JsonAttributes, LevelFilter, LineStyle, LogContext, LogEvent, LogProvider, Logger,
    LoggerBuilder, LoggerError, LoggerMetrics, MemoryConfigManager, NotificationCallback,
    NotificationKind, OutputFormat, OverflowCallback, OverflowPolicy, PropertyValue,
    ProviderDefinition, ProviderNotification, ProviderProperties, ProviderSink, ProviderStatus,
    ProviderType, Result, RetryPolicy, SinkFactory, Strictness, TimestampFormat,
    DEFAULT_PROVIDER_QUEUE_CAPACITY, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
    NAME_AND_VERSION,
};
pub use providers::{DeliveredEvent, EventHub};

//! Core logger types and traits

pub mod config;
pub mod error;
pub mod event_kind;
pub mod log_context;
pub mod log_event;
pub mod logger;
pub mod metrics;
pub mod notification;
pub mod output_format;
pub mod overflow_policy;
pub mod properties;
pub mod provider;
pub mod retry;
pub mod sink;
pub mod timestamp;

pub use config::{ConfigManager, FileConfigManager, MemoryConfigManager, ProviderDefinition};
pub use error::{LoggerError, Result};
pub use event_kind::{EventKind, LevelFilter};
pub use log_context::{FieldValue, LogContext};
pub use log_event::LogEvent;
pub use logger::{
    Logger, LoggerBuilder, DEFAULT_PROVIDER_QUEUE_CAPACITY, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT, NAME_AND_VERSION,
};
pub use metrics::LoggerMetrics;
pub use notification::{NotificationCallback, NotificationKind, ProviderNotification};
pub use output_format::{to_json, JsonAttributes, LineStyle, OutputFormat};
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use properties::{keys, PropertyValue, ProviderProperties, ProviderType, Strictness};
pub use provider::{FailurePolicy, LogProvider, ProviderStatus};
pub use retry::RetryPolicy;
pub use sink::{ProviderSink, SinkFactory};
pub use timestamp::TimestampFormat;

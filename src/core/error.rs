//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Key-value store client error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Dispatch queue full with buffer details
    #[error("Log queue full: {current}/{max} events buffered")]
    QueueFull { current: usize, max: usize },

    /// Logger already disposed
    #[error("Logger already disposed")]
    LoggerDisposed,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A provider with the same name is already registered
    #[error("A provider named '{name}' is already registered")]
    DuplicateProviderName { name: String },

    /// The provider is owned by another logger
    #[error("Provider '{name}' is already registered with a logger")]
    ProviderAlreadyRegistered { name: String },

    /// The provider is not registered with this logger
    #[error("Provider '{name}' is not registered")]
    ProviderNotFound { name: String },

    /// File provider error with path
    #[error("File provider error for '{path}': {message}")]
    FileProviderError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Transient delivery failure (connection refused, timeout, rejected reply)
    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    /// Fault that makes every further attempt fail
    #[error("{provider} unrecoverable fault: {message}")]
    UnrecoverableFault { provider: String, message: String },

    /// Retry budget exhausted for one event
    #[error("{provider} gave up after {attempts} attempts")]
    DeliveryExhausted { provider: String, attempts: u32 },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_provider(name: impl Into<String>) -> Self {
        LoggerError::DuplicateProviderName { name: name.into() }
    }

    pub fn already_registered(name: impl Into<String>) -> Self {
        LoggerError::ProviderAlreadyRegistered { name: name.into() }
    }

    pub fn provider_not_found(name: impl Into<String>) -> Self {
        LoggerError::ProviderNotFound { name: name.into() }
    }

    /// Create a file provider error
    pub fn file_provider(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileProviderError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transient transport error
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an unrecoverable provider fault
    pub fn fault(provider: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::UnrecoverableFault {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn exhausted(provider: impl Into<String>, attempts: u32) -> Self {
        LoggerError::DeliveryExhausted {
            provider: provider.into(),
            attempts,
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether a later attempt of the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LoggerError::Transport { .. } => true,
            #[cfg(feature = "redis")]
            LoggerError::Redis(_) => true,
            LoggerError::IoError(e) | LoggerError::IoOperation { source: e, .. } => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Whether the error means the provider can never deliver again
    /// without being reconfigured
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfiguration { .. } | LoggerError::UnrecoverableFault { .. }
        )
    }
}

//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`.
//!
//! # Examples
//!
//! ```
//! use fanout_logger::prelude::*;
//! use fanout_logger::info;
//!
//! let logger = Logger::new();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message of any kind with automatic formatting.
///
/// # Examples
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::log;
/// log!(logger, EventKind::Info, "Simple message");
/// log!(logger, EventKind::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $kind:expr, $($arg:tt)+) => {
        $logger.log($kind, format!($($arg)+))
    };
}

/// Log a header line.
#[macro_export]
macro_rules! header {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Header, $($arg)+)
    };
}

/// Log an info message.
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::info;
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! success {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Success, $($arg)+)
    };
}

#[macro_export]
macro_rules! done {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Done, $($arg)+)
    };
}

/// Log a warning.
///
/// ```
/// # use fanout_logger::prelude::*;
/// # let logger = Logger::new();
/// use fanout_logger::warning;
/// warning!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Critical, $($arg)+)
    };
}

#[macro_export]
macro_rules! exception {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Exception, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! custom {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::EventKind::Custom, $($arg)+)
    };
}

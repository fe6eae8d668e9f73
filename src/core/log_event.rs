//! Log event structure

use super::event_kind::EventKind;
use super::log_context::LogContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// One log event, created by the logger and shared read-only with every
/// provider it is dispatched to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub kind: EventKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<LogContext>,
}

impl LogEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: LogContext) -> Self {
        if !fields.is_empty() {
            self.fields = Some(fields);
        }
        self
    }

    /// Thread name if the emitting thread has one, its id otherwise
    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keeps_control_characters() {
        let event = LogEvent::new(EventKind::Info, "line one\nERROR fake\tentry");
        assert_eq!(event.message, "line one\nERROR fake\tentry");
    }

    #[test]
    fn test_message_kept_verbatim_otherwise() {
        let event = LogEvent::new(EventKind::Success, "Success line: 100% ok [x]");
        assert_eq!(event.message, "Success line: 100% ok [x]");
        assert!(event.fields.is_none());
    }

    #[test]
    fn test_empty_fields_are_dropped() {
        let event = LogEvent::new(EventKind::Info, "m").with_fields(LogContext::new());
        assert!(event.fields.is_none());

        let event =
            LogEvent::new(EventKind::Info, "m").with_fields(LogContext::new().with_field("k", 1));
        assert!(event.fields.is_some());
    }

    #[test]
    fn test_thread_label() {
        let handle = std::thread::Builder::new()
            .name("worker-7".to_string())
            .spawn(|| LogEvent::new(EventKind::Info, "x"))
            .unwrap();
        let event = handle.join().unwrap();
        assert_eq!(event.thread_label(), "worker-7");
    }
}

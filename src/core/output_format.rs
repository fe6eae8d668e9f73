//! Rendering of log events
//!
//! - Text: `<timestamp> [KIND] message key=value...`, used by the console,
//!   file, mail and events sinks
//! - Json: one object per event, used by the key-value store sink

use super::event_kind::EventKind;
use super::log_event::LogEvent;
use super::properties::{keys, ProviderProperties};
use super::timestamp::TimestampFormat;
use chrono::SecondsFormat;
use colored::Colorize;
use std::borrow::Cow;

/// Output format of a sink payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text line (default)
    #[default]
    Text,

    /// JSON object for machine processing
    ///
    /// Example: `{"timestamp":"2025-01-08T10:30:45.123Z","type":"INFO","message":"Request processed"}`
    Json,
}

/// Text line options shared by the human-facing sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStyle {
    pub show_timestamp: bool,
    pub show_colors: bool,
    pub underline_header: bool,
    pub timestamp_format: TimestampFormat,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            show_timestamp: true,
            show_colors: false,
            underline_header: false,
            timestamp_format: TimestampFormat::default(),
        }
    }
}

impl LineStyle {
    /// Read `ShowTimeStamp`, `ShowEventColors`, `UnderlineHeaderEventType`
    /// and `TimeStampFormat`; keys the provider type does not know keep
    /// their documented defaults
    pub fn from_properties(properties: &ProviderProperties) -> Self {
        let provider_type = properties.provider_type();
        let flag = |key: &str| provider_type.accepts_key(key) && properties.flag(key);
        Self {
            show_timestamp: flag(keys::SHOW_TIMESTAMP),
            show_colors: flag(keys::SHOW_EVENT_COLORS),
            underline_header: flag(keys::UNDERLINE_HEADER),
            timestamp_format: properties.timestamp_format(),
        }
    }

    /// Render one event as one line
    ///
    /// Line breaks in the message are written as `\n` and `\r` so a
    /// message cannot forge extra lines. Only an underlined header spans
    /// two lines.
    pub fn render(&self, event: &LogEvent) -> String {
        self.render_message(event, &escape_line_breaks(&event.message))
    }

    /// Render with the message exactly as logged, line breaks included
    pub fn render_verbatim(&self, event: &LogEvent) -> String {
        self.render_message(event, &event.message)
    }

    fn render_message(&self, event: &LogEvent, message: &str) -> String {
        let mut line = String::with_capacity(message.len() + 40);
        if self.show_timestamp {
            line.push_str(&self.timestamp_format.format(&event.timestamp));
            line.push(' ');
        }

        let tag = format!("[{}]", event.kind);
        let tag_width = tag.len();
        if self.show_colors {
            line.push_str(&tag.color(event.kind.color_code()).to_string());
        } else {
            line.push_str(&tag);
        }
        line.push(' ');
        line.push_str(message);

        if let Some(fields) = event.fields.as_ref().filter(|f| !f.is_empty()) {
            line.push(' ');
            line.push_str(&fields.format_fields());
        }

        if self.underline_header && event.kind == EventKind::Header {
            let offset = if self.show_timestamp {
                self.timestamp_format.format(&event.timestamp).chars().count() + 1
            } else {
                0
            };
            let width = offset + tag_width + 1 + message.chars().count();
            line.push('\n');
            line.push_str(&"-".repeat(width));
        }

        line
    }
}

fn escape_line_breaks(message: &str) -> Cow<'_, str> {
    if message.contains(['\n', '\r']) {
        Cow::Owned(message.replace('\n', "\\n").replace('\r', "\\r"))
    } else {
        Cow::Borrowed(message)
    }
}

/// Extra attributes stamped on every JSON payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonAttributes {
    pub environment: Option<String>,
    pub app_name: Option<String>,
}

impl JsonAttributes {
    pub fn from_properties(properties: &ProviderProperties) -> Self {
        Self {
            environment: properties.text(keys::ENVIRONMENT).map(String::from),
            app_name: properties.text(keys::APP_NAME).map(String::from),
        }
    }
}

impl OutputFormat {
    pub fn from_json_flag(as_json: bool) -> Self {
        if as_json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    pub fn render(&self, event: &LogEvent, style: &LineStyle, attributes: &JsonAttributes) -> String {
        match self {
            OutputFormat::Text => style.render(event),
            OutputFormat::Json => to_json(event, &style.timestamp_format, attributes),
        }
    }
}

/// Serialize an event as a single-line JSON object
///
/// Structured fields are merged in without overwriting the fixed keys.
pub fn to_json(
    event: &LogEvent,
    timestamp_format: &TimestampFormat,
    attributes: &JsonAttributes,
) -> String {
    let mut object = serde_json::Map::new();

    object.insert(
        "timestamp".to_string(),
        timestamp_value(event, timestamp_format),
    );
    object.insert(
        "type".to_string(),
        serde_json::Value::String(event.kind.to_str().to_string()),
    );
    object.insert(
        "message".to_string(),
        serde_json::Value::String(event.message.clone()),
    );
    object.insert(
        "thread".to_string(),
        serde_json::Value::String(event.thread_label().to_string()),
    );
    object.insert(
        "platform".to_string(),
        serde_json::Value::String(std::env::consts::OS.to_string()),
    );
    if let Some(ref environment) = attributes.environment {
        object.insert(
            "environment".to_string(),
            serde_json::Value::String(environment.clone()),
        );
    }
    if let Some(ref app) = attributes.app_name {
        object.insert("app".to_string(), serde_json::Value::String(app.clone()));
    }

    if let Some(ref fields) = event.fields {
        fields.extend_json(&mut object);
    }

    serde_json::Value::Object(object).to_string()
}

fn timestamp_value(event: &LogEvent, timestamp_format: &TimestampFormat) -> serde_json::Value {
    match timestamp_format {
        TimestampFormat::Unix => serde_json::Value::Number(event.timestamp.timestamp().into()),
        TimestampFormat::UnixMillis => {
            serde_json::Value::Number(event.timestamp.timestamp_millis().into())
        }
        TimestampFormat::Local => serde_json::Value::String(
            event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        other => serde_json::Value::String(other.format(&event.timestamp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogContext;

    fn plain() -> LineStyle {
        LineStyle {
            show_timestamp: false,
            ..LineStyle::default()
        }
    }

    #[test]
    fn test_text_line() {
        let event = LogEvent::new(EventKind::Info, "Info line");
        assert_eq!(plain().render(&event), "[INFO] Info line");
    }

    #[test]
    fn test_text_line_with_timestamp_and_fields() {
        let fields = LogContext::new()
            .with_field("user_id", 123)
            .with_field("action", "login");
        let event = LogEvent::new(EventKind::Success, "User logged in").with_fields(fields);

        let style = LineStyle {
            timestamp_format: TimestampFormat::Iso8601,
            ..LineStyle::default()
        };
        let line = style.render(&event);

        assert!(line.ends_with("[SUCCESS] User logged in action=login user_id=123"));
        assert!(line.contains('Z'));
    }

    #[test]
    fn test_line_breaks_escaped_tabs_kept() {
        let event = LogEvent::new(EventKind::Warning, "first\r\nERROR forged\tcolumn");
        assert_eq!(
            plain().render(&event),
            "[WARNING] first\\r\\nERROR forged\tcolumn"
        );
        assert_eq!(
            plain().render_verbatim(&event),
            "[WARNING] first\r\nERROR forged\tcolumn"
        );
    }

    #[test]
    fn test_json_keeps_raw_message() {
        let event = LogEvent::new(EventKind::Info, "a\nb\tc");
        let json = to_json(&event, &TimestampFormat::Local, &JsonAttributes::default());
        assert!(!json.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], "a\nb\tc");
    }

    #[test]
    fn test_underlined_header() {
        let event = LogEvent::new(EventKind::Header, "Start");
        let style = LineStyle {
            underline_header: true,
            ..plain()
        };
        assert_eq!(style.render(&event), "[HEADER] Start\n--------------");

        let info = LogEvent::new(EventKind::Info, "Start");
        assert!(!style.render(&info).contains('\n'));
    }

    #[test]
    fn test_json_payload() {
        let fields = LogContext::new().with_field("request_id", "abc-123");
        let event = LogEvent::new(EventKind::Error, "Error occurred").with_fields(fields);
        let attributes = JsonAttributes {
            environment: Some("Production".into()),
            app_name: Some("billing".into()),
        };

        let json = to_json(&event, &TimestampFormat::Local, &attributes);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["type"], "ERROR");
        assert_eq!(parsed["message"], "Error occurred");
        assert_eq!(parsed["environment"], "Production");
        assert_eq!(parsed["app"], "billing");
        assert_eq!(parsed["request_id"], "abc-123");
        assert_eq!(parsed["platform"], std::env::consts::OS);
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_json_fields_do_not_overwrite_fixed_keys() {
        let fields = LogContext::new().with_field("message", "spoofed");
        let event = LogEvent::new(EventKind::Info, "real").with_fields(fields);
        let json = to_json(&event, &TimestampFormat::UnixMillis, &JsonAttributes::default());
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["message"], "real");
        assert!(parsed["timestamp"].is_number());
        assert!(parsed.get("environment").is_none());
    }

    #[test]
    fn test_output_format_selects_renderer() {
        let event = LogEvent::new(EventKind::Warning, "disk at 91%");
        let text = OutputFormat::from_json_flag(false).render(
            &event,
            &plain(),
            &JsonAttributes::default(),
        );
        assert_eq!(text, "[WARNING] disk at 91%");

        let json = OutputFormat::Json.render(&event, &plain(), &JsonAttributes::default());
        assert!(json.starts_with('{'));
    }
}

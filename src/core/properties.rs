//! Provider option bag
//!
//! A [`ProviderProperties`] is built by the caller, filled through
//! [`ProviderProperties::set_provider_info`] and then handed to a provider,
//! which only ever reads it. Recognized keys are normalized on the way in:
//! levels are parsed, booleans coerced, ports and counts range-checked.

use super::error::{LoggerError, Result};
use super::event_kind::LevelFilter;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical option names
pub mod keys {
    pub const LOG_LEVEL: &str = "LogLevel";
    pub const ENABLED: &str = "Enabled";
    pub const ENVIRONMENT: &str = "Environment";
    pub const APP_NAME: &str = "AppName";
    pub const MAX_FAILS_TO_STOP: &str = "MaxFailsToStop";
    pub const MAX_RETRIES: &str = "MaxRetries";
    pub const RETRY_DELAY_MS: &str = "RetryDelayMs";
    pub const TIMESTAMP_FORMAT: &str = "TimeStampFormat";
    pub const SHOW_TIMESTAMP: &str = "ShowTimeStamp";
    pub const SHOW_EVENT_COLORS: &str = "ShowEventColors";
    pub const UNDERLINE_HEADER: &str = "UnderlineHeaderEventType";
    pub const FILE_NAME: &str = "FileName";
    pub const AUTO_FILE_NAME: &str = "AutoFileNameByProcess";
    pub const DAILY_ROTATE: &str = "DailyRotate";
    pub const MAX_FILE_SIZE_MB: &str = "MaxFileSizeInMB";
    pub const MAX_ROTATE_FILES: &str = "MaxRotateFiles";
    pub const COMPRESS_ROTATED: &str = "CompressRotatedFiles";
    pub const HOST: &str = "Host";
    pub const PORT: &str = "Port";
    pub const CONNECT_TIMEOUT_MS: &str = "ConnectTimeoutMs";
    pub const USER_NAME: &str = "UserName";
    pub const PASSWORD: &str = "Password";
    pub const USE_SSL: &str = "UseSSL";
    pub const SENDER_NAME: &str = "SenderName";
    pub const FROM: &str = "From";
    pub const RECIPIENT: &str = "Recipient";
    pub const SUBJECT: &str = "Subject";
    pub const BODY: &str = "Body";
    pub const CC: &str = "CC";
    pub const BCC: &str = "BCC";
    pub const OUTPUT_AS_JSON: &str = "OutputAsJson";
    pub const DATABASE: &str = "DataBase";
    pub const LOG_KEY: &str = "LogKey";
    pub const MAX_SIZE: &str = "MaxSize";
}

/// Keys whose map values are flattened into the top-level key space
const GROUP_KEYS: [&str; 2] = ["SMTP", "Mail"];

/// How a recognized option is validated and stored
#[derive(Debug, Clone, Copy)]
enum OptionKind {
    Filter,
    Flag(bool),
    Port,
    Count,
    Text,
    Timestamp,
}

const OPTIONS: &[(&str, OptionKind)] = &[
    (keys::LOG_LEVEL, OptionKind::Filter),
    (keys::ENABLED, OptionKind::Flag(true)),
    (keys::ENVIRONMENT, OptionKind::Text),
    (keys::APP_NAME, OptionKind::Text),
    (keys::MAX_FAILS_TO_STOP, OptionKind::Count),
    (keys::MAX_RETRIES, OptionKind::Count),
    (keys::RETRY_DELAY_MS, OptionKind::Count),
    (keys::TIMESTAMP_FORMAT, OptionKind::Timestamp),
    (keys::SHOW_TIMESTAMP, OptionKind::Flag(true)),
    (keys::SHOW_EVENT_COLORS, OptionKind::Flag(true)),
    (keys::UNDERLINE_HEADER, OptionKind::Flag(false)),
    (keys::FILE_NAME, OptionKind::Text),
    (keys::AUTO_FILE_NAME, OptionKind::Flag(false)),
    (keys::DAILY_ROTATE, OptionKind::Flag(false)),
    (keys::MAX_FILE_SIZE_MB, OptionKind::Count),
    (keys::MAX_ROTATE_FILES, OptionKind::Count),
    (keys::COMPRESS_ROTATED, OptionKind::Flag(false)),
    (keys::HOST, OptionKind::Text),
    (keys::PORT, OptionKind::Port),
    (keys::CONNECT_TIMEOUT_MS, OptionKind::Count),
    (keys::USER_NAME, OptionKind::Text),
    (keys::PASSWORD, OptionKind::Text),
    (keys::USE_SSL, OptionKind::Flag(false)),
    (keys::SENDER_NAME, OptionKind::Text),
    (keys::FROM, OptionKind::Text),
    (keys::RECIPIENT, OptionKind::Text),
    (keys::SUBJECT, OptionKind::Text),
    (keys::BODY, OptionKind::Text),
    (keys::CC, OptionKind::Text),
    (keys::BCC, OptionKind::Text),
    (keys::OUTPUT_AS_JSON, OptionKind::Flag(true)),
    (keys::DATABASE, OptionKind::Count),
    (keys::LOG_KEY, OptionKind::Text),
    (keys::MAX_SIZE, OptionKind::Count),
];

const COMMON_KEYS: &[&str] = &[
    keys::LOG_LEVEL,
    keys::ENABLED,
    keys::ENVIRONMENT,
    keys::APP_NAME,
    keys::MAX_FAILS_TO_STOP,
    keys::MAX_RETRIES,
    keys::RETRY_DELAY_MS,
    keys::TIMESTAMP_FORMAT,
];

const CONSOLE_KEYS: &[&str] = &[
    keys::SHOW_TIMESTAMP,
    keys::SHOW_EVENT_COLORS,
    keys::UNDERLINE_HEADER,
];

const FILE_KEYS: &[&str] = &[
    keys::SHOW_TIMESTAMP,
    keys::FILE_NAME,
    keys::AUTO_FILE_NAME,
    keys::DAILY_ROTATE,
    keys::MAX_FILE_SIZE_MB,
    keys::MAX_ROTATE_FILES,
    keys::COMPRESS_ROTATED,
];

const SMTP_KEYS: &[&str] = &[
    keys::SHOW_TIMESTAMP,
    keys::SHOW_EVENT_COLORS,
    keys::UNDERLINE_HEADER,
    keys::HOST,
    keys::PORT,
    keys::CONNECT_TIMEOUT_MS,
    keys::USER_NAME,
    keys::PASSWORD,
    keys::USE_SSL,
    keys::SENDER_NAME,
    keys::FROM,
    keys::RECIPIENT,
    keys::SUBJECT,
    keys::BODY,
    keys::CC,
    keys::BCC,
];

const REDIS_KEYS: &[&str] = &[
    keys::HOST,
    keys::PORT,
    keys::CONNECT_TIMEOUT_MS,
    keys::PASSWORD,
    keys::OUTPUT_AS_JSON,
    keys::DATABASE,
    keys::LOG_KEY,
    keys::MAX_SIZE,
];

const EVENTS_KEYS: &[&str] = &[
    keys::SHOW_TIMESTAMP,
    keys::SHOW_EVENT_COLORS,
    keys::UNDERLINE_HEADER,
];

/// Provider variant an option bag configures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderType {
    Console,
    File,
    Smtp,
    Redis,
    Events,
    /// User-supplied sink, see [`crate::LogProvider::with_sink_factory`]
    Custom(String),
}

impl ProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderType::Console => "ConsoleProvider",
            ProviderType::File => "FileProvider",
            ProviderType::Smtp => "SMTPProvider",
            ProviderType::Redis => "RedisProvider",
            ProviderType::Events => "EventsProvider",
            ProviderType::Custom(name) => name,
        }
    }

    fn specific_keys(&self) -> &'static [&'static str] {
        match self {
            ProviderType::Console => CONSOLE_KEYS,
            ProviderType::File => FILE_KEYS,
            ProviderType::Smtp => SMTP_KEYS,
            ProviderType::Redis => REDIS_KEYS,
            ProviderType::Events => EVENTS_KEYS,
            ProviderType::Custom(_) => &[],
        }
    }

    /// Whether `key` (canonical spelling) belongs to this type's schema
    pub fn accepts_key(&self, key: &str) -> bool {
        matches!(self, ProviderType::Custom(_))
            || COMMON_KEYS.contains(&key)
            || self.specific_keys().contains(&key)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let short = lower.strip_suffix("provider").unwrap_or(&lower);
        match short {
            "console" => Ok(ProviderType::Console),
            "file" => Ok(ProviderType::File),
            "smtp" | "email" | "mail" => Ok(ProviderType::Smtp),
            "redis" | "keyvalue" | "keyvaluestore" => Ok(ProviderType::Redis),
            "events" | "event" => Ok(ProviderType::Events),
            _ => Err(LoggerError::config(
                "ProviderType",
                format!("unknown provider type '{}'", s),
            )),
        }
    }
}

impl TryFrom<String> for ProviderType {
    type Error = LoggerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProviderType> for String {
    fn from(value: ProviderType) -> Self {
        value.as_str().to_string()
    }
}

/// One option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Map(BTreeMap<String, PropertyValue>),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::Map(map) => write!(f, "{{{} entries}}", map.len()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Int(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Int(i64::from(i))
    }
}

impl From<u16> for PropertyValue {
    fn from(i: u16) -> Self {
        PropertyValue::Int(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&std::path::Path> for PropertyValue {
    fn from(p: &std::path::Path) -> Self {
        PropertyValue::String(p.display().to_string())
    }
}

impl From<LevelFilter> for PropertyValue {
    fn from(level: LevelFilter) -> Self {
        PropertyValue::String(level.to_str().to_string())
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PropertyValue::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Policy for keys outside the provider type's schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strictness {
    /// Ignore them; keys unknown to every provider type are reported on stderr
    #[default]
    Lenient,
    /// Reject them with `InvalidConfiguration`
    Strict,
}

/// Named option bag for one provider instance
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProperties {
    name: String,
    provider_type: ProviderType,
    options: BTreeMap<String, PropertyValue>,
    strictness: Strictness,
}

impl ProviderProperties {
    pub fn new(name: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            name: name.into(),
            provider_type,
            options: BTreeMap::new(),
            strictness: Strictness::default(),
        }
    }

    /// Same as [`ProviderProperties::new`] with the type given by name,
    /// e.g. `"FileProvider"`
    pub fn named(name: impl Into<String>, provider_type: &str) -> Result<Self> {
        Ok(Self::new(name, provider_type.parse()?))
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Validate, normalize and store a batch of options
    ///
    /// Options already set are overwritten. On error nothing from the batch
    /// is applied.
    pub fn set_provider_info<I, K, V>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let mut flattened = Vec::new();
        for (key, value) in options {
            let key = key.into();
            match value.into() {
                PropertyValue::Map(group) if GROUP_KEYS.contains(&key.as_str()) => {
                    flattened.extend(group);
                }
                value => flattened.push((key, value)),
            }
        }

        let mut staged = Vec::with_capacity(flattened.len());
        for (key, value) in flattened {
            if let Some(normalized) = self.normalize(&key, value)? {
                staged.push(normalized);
            }
        }
        self.options.extend(staged);
        Ok(())
    }

    /// Set a single option, see [`ProviderProperties::set_provider_info`]
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Result<()> {
        self.set_provider_info([(key.into(), value.into())])
    }

    fn normalize(&self, key: &str, value: PropertyValue) -> Result<Option<(String, PropertyValue)>> {
        let component = self.provider_type.as_str();
        let Some((canonical, kind)) = OPTIONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .copied()
        else {
            return match (&self.provider_type, self.strictness) {
                (ProviderType::Custom(_), _) => Ok(Some((key.to_string(), value))),
                (_, Strictness::Strict) => Err(LoggerError::config(
                    component,
                    format!("unrecognized option '{}'", key),
                )),
                (_, Strictness::Lenient) => {
                    eprintln!(
                        "[LOGGER WARNING] Provider '{}': ignoring unrecognized option '{}'",
                        self.name, key
                    );
                    Ok(None)
                }
            };
        };

        if !self.provider_type.accepts_key(canonical) {
            return match self.strictness {
                Strictness::Strict => Err(LoggerError::config(
                    component,
                    format!("option '{}' does not apply to {}", canonical, component),
                )),
                Strictness::Lenient => Ok(None),
            };
        }

        let invalid = |what: &str| {
            LoggerError::config(
                component,
                format!("option '{}' {}, got '{}'", canonical, what, value),
            )
        };

        let normalized = match kind {
            OptionKind::Filter => {
                let level = match &value {
                    PropertyValue::String(s) => s.parse::<LevelFilter>().ok(),
                    PropertyValue::Int(i) => LevelFilter::from_index(*i),
                    _ => None,
                };
                PropertyValue::from(level.ok_or_else(|| invalid("must be a log level filter"))?)
            }
            OptionKind::Flag(default) => PropertyValue::Bool(coerce_flag(&value).unwrap_or_else(
                || {
                    eprintln!(
                        "[LOGGER WARNING] Provider '{}': option '{}' is not a boolean ('{}'), using {}",
                        self.name, canonical, value, default
                    );
                    default
                },
            )),
            OptionKind::Port => {
                let port = match &value {
                    PropertyValue::Int(i) => u16::try_from(*i).ok(),
                    PropertyValue::String(s) => s.trim().parse::<u16>().ok(),
                    _ => None,
                };
                match port {
                    Some(p) if p > 0 => PropertyValue::Int(i64::from(p)),
                    _ => return Err(invalid("must be a port number in 1..=65535")),
                }
            }
            OptionKind::Count => {
                let count = match &value {
                    PropertyValue::Int(i) => Some(*i),
                    PropertyValue::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match count {
                    Some(c) if c >= 0 => PropertyValue::Int(c),
                    _ => return Err(invalid("must be a non-negative integer")),
                }
            }
            OptionKind::Text => match value {
                PropertyValue::Map(_) => return Err(invalid("must be a scalar value")),
                PropertyValue::String(s) => PropertyValue::String(s),
                other => PropertyValue::String(other.to_string()),
            },
            OptionKind::Timestamp => match &value {
                PropertyValue::String(s) => {
                    s.parse::<TimestampFormat>()
                        .map_err(|_| invalid("must be a timestamp format"))?;
                    value
                }
                _ => return Err(invalid("must be a timestamp format")),
            },
        };

        Ok(Some((canonical.to_string(), normalized)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_type(&self) -> &ProviderType {
        &self.provider_type
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.options.get(key)
    }

    pub fn options(&self) -> &BTreeMap<String, PropertyValue> {
        &self.options
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.get(keys::LOG_LEVEL) {
            Some(PropertyValue::String(s)) => s.parse().unwrap_or_default(),
            _ => LevelFilter::default(),
        }
    }

    /// Boolean option, falling back to the key's documented default
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(PropertyValue::Bool(b)) => *b,
            _ => OPTIONS
                .iter()
                .find_map(|(name, kind)| match kind {
                    OptionKind::Flag(default) if *name == key => Some(*default),
                    _ => None,
                })
                .unwrap_or(false),
        }
    }

    /// Non-empty text option
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(PropertyValue::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Non-empty text option that the provider cannot work without
    pub fn require_text(&self, key: &str) -> Result<&str> {
        self.text(key).ok_or_else(|| {
            LoggerError::config(
                self.provider_type.as_str(),
                format!("provider '{}' is missing required option '{}'", self.name, key),
            )
        })
    }

    pub fn count(&self, key: &str) -> Option<u64> {
        match self.get(key) {
            Some(PropertyValue::Int(i)) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.count(keys::PORT).and_then(|p| u16::try_from(p).ok())
    }

    pub fn require_port(&self) -> Result<u16> {
        self.port().ok_or_else(|| {
            LoggerError::config(
                self.provider_type.as_str(),
                format!(
                    "provider '{}' is missing required option '{}'",
                    self.name,
                    keys::PORT
                ),
            )
        })
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.text(keys::TIMESTAMP_FORMAT)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

/// Lenient boolean parsing used for toggles
fn coerce_flag(value: &PropertyValue) -> Option<bool> {
    match value {
        PropertyValue::Bool(b) => Some(*b),
        PropertyValue::Int(0) => Some(false),
        PropertyValue::Int(1) => Some(true),
        PropertyValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_props() -> ProviderProperties {
        ProviderProperties::new("file", ProviderType::File)
    }

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("ConsoleProvider".parse::<ProviderType>().unwrap(), ProviderType::Console);
        assert_eq!("SMTPProvider".parse::<ProviderType>().unwrap(), ProviderType::Smtp);
        assert_eq!("redis".parse::<ProviderType>().unwrap(), ProviderType::Redis);
        assert_eq!("EventsProvider".parse::<ProviderType>().unwrap(), ProviderType::Events);
        assert!(matches!(
            "CarrierPigeon".parse::<ProviderType>(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_keys_are_normalized() {
        let mut props = file_props();
        props
            .set_provider_info([
                ("loglevel", PropertyValue::from("log_basic")),
                ("showtimestamp", PropertyValue::from("no")),
                ("FileName", PropertyValue::from("/tmp/app.log")),
                ("MaxRotateFiles", PropertyValue::from("7")),
            ])
            .unwrap();

        assert_eq!(props.level_filter(), LevelFilter::Basic);
        assert!(!props.flag(keys::SHOW_TIMESTAMP));
        assert_eq!(props.text(keys::FILE_NAME), Some("/tmp/app.log"));
        assert_eq!(props.count(keys::MAX_ROTATE_FILES), Some(7));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let mut props = file_props();
        let err = props.set(keys::LOG_LEVEL, "LOG_SOMETIMES").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(props.get(keys::LOG_LEVEL).is_none());
    }

    #[test]
    fn test_flag_coerces_to_default() {
        let mut props = ProviderProperties::new("console", ProviderType::Console);
        props.set(keys::SHOW_EVENT_COLORS, 3.5).unwrap();
        props.set(keys::UNDERLINE_HEADER, "maybe").unwrap();

        assert!(props.flag(keys::SHOW_EVENT_COLORS));
        assert!(!props.flag(keys::UNDERLINE_HEADER));
    }

    #[test]
    fn test_port_accepts_numeric_string() {
        let mut props = ProviderProperties::new("redis", ProviderType::Redis);
        props
            .set_provider_info([("Host", "192.168.1.133"), ("Port", "6379")])
            .unwrap();
        assert_eq!(props.port(), Some(6379));

        assert!(props.set(keys::PORT, "70000").is_err());
        assert!(props.set(keys::PORT, 0).is_err());
    }

    #[test]
    fn test_lenient_ignores_foreign_keys() {
        let mut props = ProviderProperties::new("redis", ProviderType::Redis);
        props
            .set_provider_info([
                ("FileName", PropertyValue::from("x.log")),
                ("DailyRotate", PropertyValue::from(false)),
                ("Bogus", PropertyValue::from(1)),
            ])
            .unwrap();
        assert!(props.options().is_empty());
    }

    #[test]
    fn test_strict_rejects_foreign_keys() {
        let mut props = ProviderProperties::new("smtp", ProviderType::Smtp)
            .with_strictness(Strictness::Strict);
        let err = props.set(keys::DAILY_ROTATE, false).unwrap_err();
        assert!(err.to_string().contains("does not apply"));

        let err = props.set("Bogus", 1).unwrap_err();
        assert!(err.to_string().contains("unrecognized"));
    }

    #[test]
    fn test_group_maps_are_flattened() {
        let mut props = ProviderProperties::new("smtp", ProviderType::Smtp);
        let smtp: PropertyValue = [
            ("Host", PropertyValue::from("mail.domain.com")),
            ("UseSSL", PropertyValue::from(false)),
        ]
        .into_iter()
        .collect();
        let mail: PropertyValue = [("Recipient", "alert@domain.com")].into_iter().collect();

        props
            .set_provider_info([("SMTP", smtp), ("Mail", mail)])
            .unwrap();

        assert_eq!(props.text(keys::HOST), Some("mail.domain.com"));
        assert_eq!(props.text(keys::RECIPIENT), Some("alert@domain.com"));
        assert!(!props.flag(keys::USE_SSL));
    }

    #[test]
    fn test_failed_batch_applies_nothing() {
        let mut props = file_props();
        let result = props.set_provider_info([
            ("FileName", PropertyValue::from("a.log")),
            ("MaxFileSizeInMB", PropertyValue::from(-1)),
        ]);
        assert!(result.is_err());
        assert!(props.options().is_empty());
    }

    #[test]
    fn test_require_text_reports_missing_key() {
        let props = ProviderProperties::new("redis", ProviderType::Redis);
        let err = props.require_text(keys::HOST).unwrap_err();
        assert!(err.to_string().contains("Host"));
        assert!(props.require_port().is_err());
    }

    #[test]
    fn test_custom_type_keeps_unknown_keys() {
        let mut props = ProviderProperties::new("custom", ProviderType::Custom("Audit".into()));
        props.set("Table", "audit_log").unwrap();
        assert_eq!(props.text("Table"), Some("audit_log"));
    }
}

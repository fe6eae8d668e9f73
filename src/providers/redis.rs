//! Key-value store provider backed by a Redis list
//!
//! Each event is appended with `RPUSH` to the list named by `LogKey`. When
//! `MaxSize` is set the list is trimmed in the same pipeline so it never
//! holds more than that many entries.

use crate::core::{
    keys, JsonAttributes, LineStyle, LogEvent, LoggerError, OutputFormat, ProviderProperties,
    ProviderSink, Result,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::time::Duration;

pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_LOG_KEY: &str = "logs";
const COMPONENT: &str = "RedisProvider";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: u64,
    pub log_key: String,
    /// Keep at most this many entries; 0 keeps everything
    pub max_size: u64,
    pub timeout: Duration,
    pub as_json: bool,
}

impl RedisSettings {
    pub fn from_properties(properties: &ProviderProperties) -> Result<Self> {
        Ok(Self {
            host: properties.require_text(keys::HOST)?.to_string(),
            port: properties.port().unwrap_or(DEFAULT_REDIS_PORT),
            password: properties.text(keys::PASSWORD).map(String::from),
            database: properties.count(keys::DATABASE).unwrap_or(0),
            log_key: properties
                .text(keys::LOG_KEY)
                .unwrap_or(DEFAULT_LOG_KEY)
                .to_string(),
            max_size: properties.count(keys::MAX_SIZE).unwrap_or(0),
            timeout: properties
                .count(keys::CONNECT_TIMEOUT_MS)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
            as_json: properties.flag(keys::OUTPUT_AS_JSON),
        })
    }

    /// Connection URL, `redis://[:password@]host:port/db`
    pub fn url(&self) -> String {
        let auth = self
            .password
            .as_deref()
            .map(|p| format!(":{}@", utf8_percent_encode(p, NON_ALPHANUMERIC)))
            .unwrap_or_default();
        format!("redis://{}{}:{}/{}", auth, self.host, self.port, self.database)
    }
}

pub struct RedisSink {
    settings: RedisSettings,
    client: redis::Client,
    connection: Option<redis::Connection>,
    format: OutputFormat,
    style: LineStyle,
    attributes: JsonAttributes,
}

impl RedisSink {
    /// Validate settings; the connection is opened on first emit
    pub fn from_properties(properties: &ProviderProperties) -> Result<Self> {
        let settings = RedisSettings::from_properties(properties)?;
        let client = redis::Client::open(settings.url().as_str()).map_err(|e| {
            LoggerError::config(COMPONENT, format!("invalid connection settings: {}", e))
        })?;
        let format = OutputFormat::from_json_flag(settings.as_json);
        Ok(Self {
            settings,
            client,
            connection: None,
            format,
            style: LineStyle {
                show_timestamp: true,
                show_colors: false,
                underline_header: false,
                timestamp_format: properties.timestamp_format(),
            },
            attributes: JsonAttributes::from_properties(properties),
        })
    }

    pub fn settings(&self) -> &RedisSettings {
        &self.settings
    }

    fn payload(&self, event: &LogEvent) -> String {
        self.format.render(event, &self.style, &self.attributes)
    }

    fn connection(&mut self) -> Result<&mut redis::Connection> {
        if self.connection.is_none() {
            let timeout = self.settings.timeout;
            let connection = self
                .client
                .get_connection_with_timeout(timeout)
                .map_err(classify)?;
            connection
                .set_read_timeout(Some(timeout))
                .map_err(classify)?;
            connection
                .set_write_timeout(Some(timeout))
                .map_err(classify)?;
            self.connection = Some(connection);
        }
        self.connection
            .as_mut()
            .ok_or_else(|| LoggerError::transport(COMPONENT, "connection unavailable"))
    }
}

/// Authentication and client configuration problems do not heal on retry
fn classify(error: redis::RedisError) -> LoggerError {
    match error.kind() {
        redis::ErrorKind::AuthenticationFailed => {
            LoggerError::fault(COMPONENT, format!("authentication failed: {}", error))
        }
        redis::ErrorKind::InvalidClientConfig => {
            LoggerError::config(COMPONENT, error.to_string())
        }
        _ => LoggerError::Redis(error),
    }
}

impl ProviderSink for RedisSink {
    fn emit(&mut self, event: &LogEvent) -> Result<()> {
        let payload = self.payload(event);
        let key = self.settings.log_key.clone();
        let max_size = self.settings.max_size;

        let mut pipe = redis::pipe();
        pipe.cmd("RPUSH").arg(&key).arg(payload).ignore();
        if max_size > 0 {
            let keep = i64::try_from(max_size).unwrap_or(i64::MAX);
            pipe.cmd("LTRIM").arg(&key).arg(-keep).arg(-1).ignore();
        }

        let connection = self.connection()?;
        let result: redis::RedisResult<()> = pipe.query(connection);
        if let Err(e) = result {
            // Force a reconnect on the next attempt
            self.connection = None;
            return Err(classify(e));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.connection = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

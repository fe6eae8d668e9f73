//! Event kinds and provider level filters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a log event
///
/// Kinds are not strictly ordered by importance; instead each kind belongs
/// to a verbosity tier, and a [`LevelFilter`] accepts every kind whose tier
/// does not exceed its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventKind {
    Header,
    #[default]
    Info,
    Success,
    Done,
    Warning,
    Error,
    Critical,
    Exception,
    Debug,
    Trace,
    Custom,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::Header,
        EventKind::Info,
        EventKind::Success,
        EventKind::Done,
        EventKind::Warning,
        EventKind::Error,
        EventKind::Critical,
        EventKind::Exception,
        EventKind::Debug,
        EventKind::Trace,
        EventKind::Custom,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            EventKind::Header => "HEADER",
            EventKind::Info => "INFO",
            EventKind::Success => "SUCCESS",
            EventKind::Done => "DONE",
            EventKind::Warning => "WARNING",
            EventKind::Error => "ERROR",
            EventKind::Critical => "CRITICAL",
            EventKind::Exception => "EXCEPTION",
            EventKind::Debug => "DEBUG",
            EventKind::Trace => "TRACE",
            EventKind::Custom => "CUSTOM",
        }
    }

    /// Verbosity tier: lower tiers pass stricter filters
    pub fn tier(&self) -> u8 {
        match self {
            EventKind::Header
            | EventKind::Info
            | EventKind::Error
            | EventKind::Critical
            | EventKind::Exception => 0,
            EventKind::Warning => 1,
            EventKind::Success => 2,
            EventKind::Done | EventKind::Custom => 3,
            EventKind::Trace => 4,
            EventKind::Debug => 5,
        }
    }

    /// Kinds routed to stderr by the console provider
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EventKind::Error | EventKind::Critical | EventKind::Exception
        )
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            EventKind::Header => BrightWhite,
            EventKind::Info => White,
            EventKind::Success | EventKind::Done => Green,
            EventKind::Warning => Yellow,
            EventKind::Error => Red,
            EventKind::Critical | EventKind::Exception => BrightRed,
            EventKind::Debug => Cyan,
            EventKind::Trace => BrightBlack,
            EventKind::Custom => Magenta,
        }
    }

    /// Colour used when the event is rendered as HTML (SMTP provider)
    pub fn html_color(&self) -> &'static str {
        match self {
            EventKind::Header => "#000000",
            EventKind::Info => "#1f4e79",
            EventKind::Success | EventKind::Done => "#2e7d32",
            EventKind::Warning => "#b8860b",
            EventKind::Error => "#c62828",
            EventKind::Critical | EventKind::Exception => "#8b0000",
            EventKind::Debug => "#00838f",
            EventKind::Trace => "#757575",
            EventKind::Custom => "#6a1b9a",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.to_str() == upper)
            .or(match upper.as_str() {
                "WARN" => Some(EventKind::Warning),
                "FATAL" => Some(EventKind::Critical),
                _ => None,
            })
            .ok_or_else(|| format!("Invalid event kind: '{}'", s))
    }
}

/// Preset filter configured through the `LogLevel` provider option
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum LevelFilter {
    OnlyErrors = 0,
    ErrorsAndWarnings = 1,
    Basic = 2,
    #[default]
    All = 3,
    Trace = 4,
    Debug = 5,
}

impl LevelFilter {
    pub const ALL: [LevelFilter; 6] = [
        LevelFilter::OnlyErrors,
        LevelFilter::ErrorsAndWarnings,
        LevelFilter::Basic,
        LevelFilter::All,
        LevelFilter::Trace,
        LevelFilter::Debug,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LevelFilter::OnlyErrors => "LOG_ONLYERRORS",
            LevelFilter::ErrorsAndWarnings => "LOG_ERRORSANDWARNINGS",
            LevelFilter::Basic => "LOG_BASIC",
            LevelFilter::All => "LOG_ALL",
            LevelFilter::Trace => "LOG_TRACE",
            LevelFilter::Debug => "LOG_DEBUG",
        }
    }

    #[inline]
    pub fn tier(&self) -> u8 {
        *self as u8
    }

    #[inline]
    pub fn accepts(&self, kind: EventKind) -> bool {
        kind.tier() <= self.tier()
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| LevelFilter::ALL.get(i).copied())
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LevelFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['_', ' '], "");
        let normalized = normalized.strip_prefix("LOG").unwrap_or(&normalized);
        match normalized {
            "ONLYERRORS" | "ERRORS" => Ok(LevelFilter::OnlyErrors),
            "ERRORSANDWARNINGS" => Ok(LevelFilter::ErrorsAndWarnings),
            "BASIC" => Ok(LevelFilter::Basic),
            "ALL" => Ok(LevelFilter::All),
            "TRACE" => Ok(LevelFilter::Trace),
            "DEBUG" | "VERBOSE" => Ok(LevelFilter::Debug),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(LevelFilter::from_index)
                .ok_or_else(|| format!("Invalid log level filter: '{}'", s)),
        }
    }
}

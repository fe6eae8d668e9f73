//! Built-in provider sinks

pub mod console;
pub mod events;
pub mod file;
#[cfg(feature = "redis")]
pub mod redis;
pub mod smtp;

pub use console::ConsoleSink;
pub use events::{DeliveredEvent, EventHandler, EventHub, EventsSink, DEFAULT_SUBSCRIBER_CAPACITY};
pub use file::{FileSink, RotationPolicy};
#[cfg(feature = "redis")]
pub use redis::{RedisSettings, RedisSink};
pub use smtp::{SmtpSettings, SmtpSink};

use crate::core::{
    FailurePolicy, LoggerError, ProviderProperties, ProviderSink, ProviderType, Result,
    RetryPolicy, SinkFactory,
};
use std::sync::Arc;

/// Everything a built-in provider type needs besides its properties
pub(crate) struct SinkBinding {
    pub factory: SinkFactory,
    pub failure_policy: FailurePolicy,
    pub event_hub: Option<EventHub>,
}

/// Pick the sink factory and failure policy for a provider type
///
/// Local sinks are disabled on their first fault; network sinks retry with
/// backoff.
pub(crate) fn bind(properties: &ProviderProperties) -> SinkBinding {
    let local = FailurePolicy::DisableOnFault;
    let network = FailurePolicy::Retry(RetryPolicy::from_properties(properties));

    match properties.provider_type() {
        ProviderType::Console => SinkBinding {
            factory: factory(|p| Ok(Box::new(ConsoleSink::from_properties(p)?))),
            failure_policy: local,
            event_hub: None,
        },
        ProviderType::File => SinkBinding {
            factory: factory(|p| Ok(Box::new(FileSink::from_properties(p)?))),
            failure_policy: local,
            event_hub: None,
        },
        ProviderType::Events => {
            let hub = EventHub::new();
            let sink_hub = hub.clone();
            SinkBinding {
                factory: Arc::new(move |p: &ProviderProperties| {
                    Ok(Box::new(EventsSink::from_properties(p, sink_hub.clone())?)
                        as Box<dyn ProviderSink>)
                }),
                failure_policy: local,
                event_hub: Some(hub),
            }
        }
        ProviderType::Smtp => SinkBinding {
            factory: factory(|p| Ok(Box::new(SmtpSink::from_properties(p)?))),
            failure_policy: network,
            event_hub: None,
        },
        #[cfg(feature = "redis")]
        ProviderType::Redis => SinkBinding {
            factory: factory(|p| Ok(Box::new(RedisSink::from_properties(p)?))),
            failure_policy: network,
            event_hub: None,
        },
        #[cfg(not(feature = "redis"))]
        ProviderType::Redis => SinkBinding {
            factory: factory(|p| Err(redis_disabled(p))),
            failure_policy: local,
            event_hub: None,
        },
        ProviderType::Custom(_) => SinkBinding {
            factory: factory(|p| Err(missing_factory(p))),
            failure_policy: local,
            event_hub: None,
        },
    }
}

/// Check the options a provider type cannot work without
pub(crate) fn validate(properties: &ProviderProperties) -> Result<()> {
    match properties.provider_type() {
        ProviderType::Console | ProviderType::Events => Ok(()),
        ProviderType::File => file::resolve_path(properties).map(drop),
        ProviderType::Smtp => SmtpSettings::from_properties(properties).map(drop),
        #[cfg(feature = "redis")]
        ProviderType::Redis => {
            properties.require_port()?;
            RedisSettings::from_properties(properties).map(drop)
        }
        #[cfg(not(feature = "redis"))]
        ProviderType::Redis => Err(redis_disabled(properties)),
        ProviderType::Custom(_) => Err(missing_factory(properties)),
    }
}

fn factory<F>(build: F) -> SinkFactory
where
    F: Fn(&ProviderProperties) -> Result<Box<dyn ProviderSink>> + Send + Sync + 'static,
{
    Arc::new(build)
}

fn missing_factory(properties: &ProviderProperties) -> LoggerError {
    LoggerError::config(
        properties.provider_type().as_str(),
        format!(
            "provider '{}' has a custom type; create it with LogProvider::with_sink_factory",
            properties.name()
        ),
    )
}

#[cfg(not(feature = "redis"))]
fn redis_disabled(properties: &ProviderProperties) -> LoggerError {
    LoggerError::config(
        properties.provider_type().as_str(),
        format!(
            "provider '{}' needs the crate's `redis` feature",
            properties.name()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_types_retry() {
        let smtp = ProviderProperties::new("mail", ProviderType::Smtp);
        assert!(matches!(bind(&smtp).failure_policy, FailurePolicy::Retry(_)));

        let console = ProviderProperties::new("console", ProviderType::Console);
        assert_eq!(bind(&console).failure_policy, FailurePolicy::DisableOnFault);
    }

    #[test]
    fn test_events_binding_carries_hub() {
        let events = ProviderProperties::new("events", ProviderType::Events);
        let binding = bind(&events);
        assert!(binding.event_hub.is_some());
        assert!((binding.factory)(&events).is_ok());
    }

    #[test]
    fn test_validate_required_options() {
        assert!(validate(&ProviderProperties::new("c", ProviderType::Console)).is_ok());
        assert!(validate(&ProviderProperties::new("f", ProviderType::File)).is_err());
        assert!(validate(&ProviderProperties::new("m", ProviderType::Smtp)).is_err());
        assert!(validate(&ProviderProperties::new("r", ProviderType::Redis)).is_err());

        let custom = ProviderProperties::new("x", ProviderType::Custom("Audit".into()));
        let err = validate(&custom).unwrap_err();
        assert!(err.is_unrecoverable());
        assert!((bind(&custom).factory)(&custom).is_err());
    }
}

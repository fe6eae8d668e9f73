//! Sink trait: the I/O half of a provider

use super::{error::Result, log_event::LogEvent, properties::ProviderProperties};
use std::sync::Arc;

/// Output destination driven by a provider worker
///
/// A sink is only ever touched by its provider's worker thread, one call at
/// a time. Errors and panics are turned into provider signals; they never
/// reach the code that logged the event.
pub trait ProviderSink: Send {
    fn emit(&mut self, event: &LogEvent) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release held resources (file handle, connection)
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}

/// Builds a sink from the provider's properties, on first use and again
/// after every release
pub type SinkFactory =
    Arc<dyn Fn(&ProviderProperties) -> Result<Box<dyn ProviderSink>> + Send + Sync>;

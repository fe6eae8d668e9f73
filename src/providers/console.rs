//! Console provider

use crate::core::{LineStyle, LogEvent, ProviderProperties, ProviderSink, Result};
use std::io::Write;

/// Writes one line per event; failure kinds go to stderr, the rest to stdout
pub struct ConsoleSink {
    style: LineStyle,
}

impl ConsoleSink {
    pub fn new(style: LineStyle) -> Self {
        Self { style }
    }

    pub fn from_properties(properties: &ProviderProperties) -> Result<Self> {
        Ok(Self::new(LineStyle::from_properties(properties)))
    }

    pub fn style(&self) -> &LineStyle {
        &self.style
    }
}

impl ProviderSink for ConsoleSink {
    fn emit(&mut self, event: &LogEvent) -> Result<()> {
        let line = self.style.render(event);
        if event.kind.is_failure() {
            writeln!(std::io::stderr().lock(), "{}", line)?;
        } else {
            writeln!(std::io::stdout().lock(), "{}", line)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

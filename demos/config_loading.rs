//! Configuration example
//!
//! Saves provider definitions to a JSON file, loads them into a fresh
//! logger and watches the logger-wide notification channel.
//!
//! Run with: cargo run --example config_loading

use fanout_logger::prelude::*;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== fanout_logger - Configuration Example ===\n");

    let definitions = vec![
        ProviderDefinition::new("Console", ProviderType::Console)
            .with_option(keys::LOG_LEVEL, LevelFilter::All)
            .with_option(keys::SHOW_EVENT_COLORS, true),
        ProviderDefinition::new("File", ProviderType::File)
            .with_option(keys::FILE_NAME, "logs/configured.log")
            .with_option(keys::DAILY_ROTATE, true),
        // Unreachable on purpose: shows retries and FailToLog
        ProviderDefinition::new("Redis", ProviderType::Redis)
            .with_option(keys::HOST, "127.0.0.1")
            .with_option(keys::PORT, 1)
            .with_option(keys::MAX_RETRIES, 1)
            .with_option(keys::LOG_LEVEL, LevelFilter::OnlyErrors),
    ];

    let manager = FileConfigManager::new("logs/providers.json");
    manager.save(&definitions)?;
    println!("1. Saved {} definitions to {}", definitions.len(), manager.path().display());

    let logger = Logger::new();
    let signals = logger.notifications();
    let providers = logger.add_providers_from(&manager)?;
    println!("2. Loaded providers:");
    for provider in &providers {
        println!("   - {} ({})", provider.name(), provider.provider_type());
    }

    println!("\n3. Logging:");
    logger.header("Configured logger");
    logger.info("Loaded from JSON");
    logger.error("This error is also offered to Redis");
    logger.flush()?;

    println!("\n4. Signals received:");
    while let Ok(signal) = signals.recv_timeout(Duration::from_millis(500)) {
        println!("   [{}] {}: {}", signal.kind, signal.provider, signal.message);
    }

    logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT);
    println!("\n=== Example completed successfully! ===");

    Ok(())
}

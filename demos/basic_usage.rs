//! Basic logger usage example
//!
//! Demonstrates a console provider, the event kinds, per-provider filters
//! and provider signals.
//!
//! Run with: cargo run --example basic_usage

use fanout_logger::prelude::*;
use fanout_logger::{info, warning};

fn main() -> Result<()> {
    println!("=== fanout_logger - Basic Usage Example ===\n");

    let logger = Logger::new();
    println!("{}\n", logger.name_and_version());

    // Console provider showing every kind, colored
    let mut console = ProviderProperties::new("Console", ProviderType::Console);
    console.set_provider_info([
        (keys::LOG_LEVEL, PropertyValue::from(LevelFilter::Debug)),
        (keys::SHOW_EVENT_COLORS, true.into()),
        (keys::UNDERLINE_HEADER, true.into()),
    ])?;
    let console = LogProvider::new(console)?;
    console.on_status_changed(|status| eprintln!("   (console is now {})", status));
    logger.add_provider(&console)?;

    println!("1. Logging every event kind:");
    logger.header("Event kinds");
    logger.info("This is an info message");
    logger.success("This is a success message");
    logger.done("This is a done message");
    logger.warning("This is a warning message");
    logger.error("This is an error message");
    logger.critical("This is a critical message");
    logger.exception("This is an exception message");
    logger.debug("This is a debug message");
    logger.trace("This is a trace message");
    logger.custom("This is a custom message");
    logger.flush()?;

    println!("\n2. Formatting macros and structured fields:");
    let port = 8080;
    info!(logger, "Server listening on port {}", port);
    warning!(logger, "Retry attempt {} of {}", 2, 5);
    logger.log_with_context(
        EventKind::Info,
        "User logged in",
        LogContext::new()
            .with_field("user_id", 12345)
            .with_field("ip", "192.168.1.1"),
    );
    logger.flush()?;

    println!("\n3. Disabling the provider (nothing below is shown):");
    logger.disable_provider(&console)?;
    logger.info("Hidden message");
    logger.enable_provider(&console)?;
    logger.info("Visible again");
    logger.flush()?;

    logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT);
    println!("\n=== Example completed successfully! ===");

    Ok(())
}

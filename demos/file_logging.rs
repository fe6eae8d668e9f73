//! File logging example
//!
//! Demonstrates logging to console and file providers simultaneously, with
//! size-based rotation on the file.
//!
//! Run with: cargo run --example file_logging

use fanout_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== fanout_logger - File Logging Example ===\n");

    let logger = Logger::new();

    let mut console = ProviderProperties::new("Console", ProviderType::Console);
    console.set(keys::LOG_LEVEL, LevelFilter::ErrorsAndWarnings)?;
    logger.add_provider(&LogProvider::new(console)?)?;

    let mut file = ProviderProperties::new("File", ProviderType::File);
    file.set_provider_info([
        (keys::FILE_NAME, PropertyValue::from("logs/application.log")),
        (keys::LOG_LEVEL, LevelFilter::Debug.into()),
        (keys::MAX_FILE_SIZE_MB, 10i64.into()),
        (keys::MAX_ROTATE_FILES, 3i64.into()),
        (keys::COMPRESS_ROTATED, true.into()),
    ])?;
    let file = LogProvider::new(file)?;
    file.on_error(|message| eprintln!("file provider error: {}", message));
    logger.add_provider(&file)?;

    println!("1. Warnings and errors go to the console, everything to the file:");
    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.info("Configuration loaded successfully");
    logger.warning("Using default settings for some options");
    logger.info("Connecting to database...");
    logger.success("Database connection established");
    logger.error("Failed to load optional plugin");
    logger.done("Application initialization complete");

    println!("\n2. Performing some operations:");
    for i in 1..=5 {
        logger.info(format!("Processing item {}/5", i));
        if i == 3 {
            logger.warning("Item 3 took longer than expected");
        }
    }
    logger.flush()?;

    println!(
        "\n{} events written to the file",
        file.delivered_count()
    );

    // Releases the file handle
    logger.remove_provider(&file)?;
    logger.dispose(DEFAULT_SHUTDOWN_TIMEOUT);

    println!("\n=== Example completed successfully! ===");
    println!("Check 'logs/application.log' for the full log output");

    Ok(())
}

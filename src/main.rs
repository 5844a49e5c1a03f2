use std::sync::Arc;

use tracing::{error, info};

use msgdrive::{Config, Drive, IdentityGate, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = msgdrive::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        msgdrive::logging::init_console_only(&config.logging.level);
    }

    info!("msgdrive - messaging-backed cloud drive");

    if let Err(e) = run(config).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> msgdrive::Result<()> {
    config.validate()?;

    let drive = Arc::new(Drive::open(&config)?);
    let gate = Arc::new(IdentityGate::from_config(&config.auth));

    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    WebServer::new(&config, drive, gate)?.run().await
}

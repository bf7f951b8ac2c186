//! Depot API server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p depot-api
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use depot_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let tracing_config = if config.app.env.is_production() {
        TracingConfig::production()
    } else {
        TracingConfig::development()
    };
    if let Err(e) = try_init_tracing_with_config(tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        host = %config.api.host,
        port = config.api.port,
        "Starting Depot API server"
    );

    if let Err(e) = depot_api::run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

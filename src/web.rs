#![cfg(not(tarpaulin_include))]

use leaderboard_export::{app, Config};

/// Main entry point for the web application
///
/// Reads an optional JSON config path from the first argument and starts
/// the web server. Log verbosity follows `RUST_LOG`, defaulting to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args()?;
    log::info!(
        "exporting from {} with {:?} cleanup",
        config.api_base_url,
        config.cleanup
    );

    app::run(config).await
}

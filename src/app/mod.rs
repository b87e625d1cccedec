mod config;
mod error;
mod logging;
pub mod runtime;

pub use config::AppConfig;
pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    // .env values feed both the log filter and the config lookup.
    dotenvy::dotenv().ok();

    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        poll_interval_secs = config.poll_interval_secs,
        startup_grace_ms = config.startup_grace_ms,
        request_timeout_secs = config.request_timeout_secs,
        store_path = %config.store_path,
        "application bootstrap initialized"
    );

    runtime::run(config)
}

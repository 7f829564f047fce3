use roomgen::logger::{self, LoggerConfig};
use roomgen::Config;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    config.validate()?;

    logger::log_startup_info(
        "roomgen",
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port.unwrap_or(8080),
    );
    logger::log_config_info(&config);

    if !config.has_credentials() {
        log::error!(
            "❌ No API key for provider '{}'; requests will fail with missing_credential",
            config.provider
        );
    }

    roomgen::server::serve(config).await?;

    log::info!("👋 Server stopped");
    Ok(())
}

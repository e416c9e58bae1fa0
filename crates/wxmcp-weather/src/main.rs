//! `fetch-weather` MCP server over stdio.
//!
//! Usage:
//!   wxmcp-weather                          # defaults, Open-Meteo endpoints
//!   wxmcp-weather --timeout-ms 5000 --log-level debug
//!
//! Logs go to stderr; stdout carries protocol traffic only.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wxmcp::Server;
use wxmcp_weather::{
    DEFAULT_FORECAST_URL, DEFAULT_GEOCODING_URL, SERVER_NAME, WeatherConfig, WeatherError,
};

#[derive(Parser, Debug)]
#[command(name = "wxmcp-weather")]
#[command(about = "MCP server with a fetch-weather tool", long_about = None)]
/// CLI options for the weather server.
struct Cli {
    /// Geocoding search endpoint
    #[arg(long, env = "WXMCP_GEOCODING_URL", default_value = DEFAULT_GEOCODING_URL)]
    geocoding_url: String,

    /// Forecast endpoint
    #[arg(long, env = "WXMCP_FORECAST_URL", default_value = DEFAULT_FORECAST_URL)]
    forecast_url: String,

    /// Per-request timeout for upstream calls, in milliseconds
    #[arg(long, env = "WXMCP_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,

    /// Language for geocoding results
    #[arg(long, env = "WXMCP_LANGUAGE", default_value = "en")]
    language: String,

    /// Comma-separated forecast variables for the `current` block
    #[arg(
        long,
        env = "WXMCP_CURRENT",
        value_delimiter = ',',
        default_value = "temperature_2m,wind_speed_10m"
    )]
    current: Vec<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "WXMCP_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> WeatherConfig {
        WeatherConfig::default()
            .with_geocoding_url(&self.geocoding_url)
            .with_forecast_url(&self.forecast_url)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_language(&self.language)
            .with_current(self.current.iter().filter(|v| !v.is_empty()).cloned())
    }
}

#[tokio::main]
async fn main() -> Result<(), WeatherError> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let handler = match wxmcp_weather::tool_server(&cli.config()) {
        Ok(handler) => handler,
        Err(e) => {
            error!("Failed to start: {}", e);
            return Err(e);
        }
    };

    info!(
        "Starting {} {} on stdio",
        SERVER_NAME,
        env!("CARGO_PKG_VERSION")
    );
    Server::new(move || handler.clone()).serve_stdio().await?;
    info!("Shut down");
    Ok(())
}

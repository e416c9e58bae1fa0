//! # wxmcp-weather
//!
//! An MCP tool server exposing a single `fetch-weather` tool. The tool
//! resolves a city name through a geocoding service, then returns the
//! forecast for the first match. Both lookups go to Open-Meteo by default.
//!
//! ```ignore
//! let handler = wxmcp_weather::tool_server(&WeatherConfig::default())?;
//! Server::new(move || handler.clone()).serve_stdio().await?;
//! ```

mod client;
mod config;
mod error;
mod fetch_weather;

use std::sync::Arc;

use wxmcp::{ToolServer, ToolSet};

pub use client::{Coordinates, OpenMeteoClient, WeatherApi};
pub use config::{
    DEFAULT_CURRENT, DEFAULT_FORECAST_URL, DEFAULT_GEOCODING_URL, DEFAULT_TIMEOUT, MAX_TIMEOUT,
    WeatherConfig,
};
pub use error::{WeatherError, WeatherResult};
pub use fetch_weather::{FetchWeather, TOOL_NAME, WeatherParams};

/// Server name reported on initialize.
pub const SERVER_NAME: &str = "wxmcp-weather";

/// Build the tool set served by this crate.
pub fn tool_set(config: &WeatherConfig) -> WeatherResult<ToolSet> {
    let mut tools = ToolSet::new();
    tools.register_handler(FetchWeather::new(OpenMeteoClient::new(config)?))?;
    Ok(tools)
}

/// Build a ready-to-serve handler.
pub fn tool_server(config: &WeatherConfig) -> WeatherResult<ToolServer> {
    let tools = tool_set(config)?;
    Ok(
        ToolServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), Arc::new(tools))
            .with_instructions("Call fetch-weather with a city name to get its current weather."),
    )
}

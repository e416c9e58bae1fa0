/// Result type for configuration and startup.
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Errors that stop the weather server from starting or serving.
///
/// Failures of individual tool calls are not represented here; those are
/// [`wxmcp::ToolError`] values returned to the host.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// Registration or serving failed.
    #[error(transparent)]
    Server(#[from] wxmcp::Error),
}

use std::time::Duration;

use url::Url;

use crate::error::{WeatherError, WeatherResult};

/// Default Open-Meteo geocoding endpoint.
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
/// Default Open-Meteo forecast endpoint.
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest per-request timeout accepted.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);
/// Default `current` forecast variables.
pub const DEFAULT_CURRENT: &[&str] = &["temperature_2m", "wind_speed_10m"];

/// Upstream endpoints and limits for the weather provider.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Geocoding search endpoint.
    pub geocoding_url: String,
    /// Forecast endpoint.
    pub forecast_url: String,
    /// Deadline for each outbound request.
    pub timeout: Duration,
    /// Number of geocoding candidates requested; only the first is used.
    pub result_count: u32,
    /// Language for geocoding results.
    pub language: String,
    /// Variables requested in the forecast's `current` block. Empty omits it.
    pub current: Vec<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            result_count: 1,
            language: "en".to_string(),
            current: DEFAULT_CURRENT.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl WeatherConfig {
    /// Set the geocoding endpoint.
    pub fn with_geocoding_url(mut self, url: impl Into<String>) -> Self {
        self.geocoding_url = url.into();
        self
    }

    /// Set the forecast endpoint.
    pub fn with_forecast_url(mut self, url: impl Into<String>) -> Self {
        self.forecast_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the geocoding language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the forecast `current` variables.
    pub fn with_current<I, S>(mut self, current: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.current = current.into_iter().map(Into::into).collect();
        self
    }

    /// Check every field, returning the parsed endpoint URLs.
    pub fn validate(&self) -> WeatherResult<(Url, Url)> {
        let geocoding = parse_http_url(&self.geocoding_url, "geocoding URL")?;
        let forecast = parse_http_url(&self.forecast_url, "forecast URL")?;
        if self.timeout.is_zero() || self.timeout > MAX_TIMEOUT {
            return Err(WeatherError::InvalidConfiguration(format!(
                "timeout must be between 1ms and {}s, got {}ms",
                MAX_TIMEOUT.as_secs(),
                self.timeout.as_millis()
            )));
        }
        if !(1..=100).contains(&self.result_count) {
            return Err(WeatherError::InvalidConfiguration(format!(
                "result count must be between 1 and 100, got {}",
                self.result_count
            )));
        }
        if self.language.trim().is_empty() {
            return Err(WeatherError::InvalidConfiguration(
                "language must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self.current.iter().find(|v| v.trim().is_empty()) {
            return Err(WeatherError::InvalidConfiguration(format!(
                "invalid forecast variable {bad:?}"
            )));
        }
        Ok((geocoding, forecast))
    }
}

/// Parse an HTTP or HTTPS URL with a clear validation error.
fn parse_http_url(value: &str, context: &str) -> WeatherResult<Url> {
    let url = Url::parse(value)
        .map_err(|e| WeatherError::InvalidConfiguration(format!("Invalid {context}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WeatherError::InvalidConfiguration(format!(
            "Invalid {context}: unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WeatherConfig::default();
        let (geocoding, forecast) = config.validate().unwrap();
        assert_eq!(geocoding.host_str(), Some("geocoding-api.open-meteo.com"));
        assert_eq!(forecast.path(), "/v1/forecast");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.result_count, 1);
        assert_eq!(config.current, ["temperature_2m", "wind_speed_10m"]);
    }

    #[test]
    fn test_rejects_bad_urls() {
        let err = WeatherConfig::default()
            .with_forecast_url("ftp://example.com/forecast")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));

        let err = WeatherConfig::default()
            .with_geocoding_url("not a url")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("geocoding URL"));
    }

    #[test]
    fn test_timeout_bounds() {
        assert!(
            WeatherConfig::default()
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            WeatherConfig::default()
                .with_timeout(Duration::from_secs(301))
                .validate()
                .is_err()
        );
        assert!(
            WeatherConfig::default()
                .with_timeout(Duration::from_millis(1))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_blank_language_and_variables() {
        assert!(
            WeatherConfig::default()
                .with_language(" ")
                .validate()
                .is_err()
        );
        assert!(
            WeatherConfig::default()
                .with_current(["temperature_2m", ""])
                .validate()
                .is_err()
        );
        assert!(
            WeatherConfig::default()
                .with_current(Vec::<String>::new())
                .validate()
                .is_ok()
        );
    }
}

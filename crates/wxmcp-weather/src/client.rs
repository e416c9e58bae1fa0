use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;
use wxmcp::{ToolError, ToolResult};

use crate::{config::WeatherConfig, error::WeatherResult};

/// A resolved location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// The two upstream lookups behind `fetch-weather`.
#[async_trait]
pub trait WeatherApi: Send + Sync + 'static {
    /// Resolve a city name to coordinates.
    async fn geocode(&self, city: &str) -> ToolResult<Coordinates>;

    /// Fetch the forecast for a location, verbatim.
    async fn forecast(&self, coordinates: Coordinates) -> ToolResult<Value>;
}

/// [`WeatherApi`] backed by the Open-Meteo HTTP APIs.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    geocoding_url: Url,
    forecast_url: Url,
    result_count: u32,
    language: String,
    current: Vec<String>,
}

impl OpenMeteoClient {
    /// Build a client from validated configuration.
    pub fn new(config: &WeatherConfig) -> WeatherResult<Self> {
        let (geocoding_url, forecast_url) = config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("wxmcp-weather/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            geocoding_url,
            forecast_url,
            result_count: config.result_count,
            language: config.language.clone(),
            current: config.current.clone(),
        })
    }

    /// Geocoding request URL for `city`.
    pub fn geocode_url(&self, city: &str) -> Url {
        let mut url = self.geocoding_url.clone();
        url.query_pairs_mut()
            .append_pair("name", city)
            .append_pair("count", &self.result_count.to_string())
            .append_pair("language", &self.language)
            .append_pair("format", "json");
        url
    }

    /// Forecast request URL for `coordinates`.
    pub fn forecast_url(&self, coordinates: Coordinates) -> Url {
        let mut url = self.forecast_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("latitude", &coordinates.latitude.to_string())
                .append_pair("longitude", &coordinates.longitude.to_string());
            if !self.current.is_empty() {
                query.append_pair("current", &self.current.join(","));
            }
        }
        url
    }

    /// GET `url` and parse the body as JSON, mapping every fault to a tool error.
    async fn fetch_json(&self, stage: &str, url: Url) -> ToolResult<Value> {
        debug!("{} request: {}", stage, url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(stage, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::upstream_error(
                status.as_u16(),
                format!("{stage} request failed with status: {status}"),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(stage, &e))?;
        serde_json::from_slice(&body).map_err(|e| {
            ToolError::malformed_response(format!("{stage} response is not valid JSON: {e}"))
        })
    }
}

#[async_trait]
impl WeatherApi for OpenMeteoClient {
    async fn geocode(&self, city: &str) -> ToolResult<Coordinates> {
        let body = self.fetch_json("Geocoding", self.geocode_url(city)).await?;
        first_result(&body, city)
    }

    async fn forecast(&self, coordinates: Coordinates) -> ToolResult<Value> {
        self.fetch_json("Forecast", self.forecast_url(coordinates))
            .await
    }
}

/// Map a reqwest failure to `timeout` or `upstream-unreachable`.
fn request_error(stage: &str, error: &reqwest::Error) -> ToolError {
    if error.is_timeout() {
        ToolError::timeout(format!("{stage} request timed out"))
    } else {
        ToolError::upstream_unreachable(format!("{stage} request failed: {error}"))
    }
}

/// Coordinates of the first geocoding candidate.
fn first_result(body: &Value, city: &str) -> ToolResult<Coordinates> {
    let Some(object) = body.as_object() else {
        return Err(ToolError::malformed_response(
            "Geocoding response is not a JSON object",
        ));
    };
    let first = match object.get("results") {
        None | Some(Value::Null) => None,
        Some(Value::Array(results)) => results.first(),
        Some(_) => {
            return Err(ToolError::malformed_response(
                "Geocoding results is not a list",
            ));
        }
    };
    let Some(first) = first else {
        return Err(ToolError::not_found(format!("City not found: {city}")));
    };

    let coordinate = |field: &str| {
        first.get(field).and_then(Value::as_f64).ok_or_else(|| {
            ToolError::malformed_response(format!(
                "Geocoding result lacks a numeric {field}"
            ))
        })
    };
    Ok(Coordinates {
        latitude: coordinate("latitude")?,
        longitude: coordinate("longitude")?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wxmcp::ToolErrorKind;

    use super::*;

    fn client() -> OpenMeteoClient {
        OpenMeteoClient::new(&WeatherConfig::default()).unwrap()
    }

    #[test]
    fn test_geocode_url_escapes_city() {
        let url = client().geocode_url("São Paulo & Co");
        assert_eq!(url.path(), "/v1/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [
                ("name".to_string(), "São Paulo & Co".to_string()),
                ("count".to_string(), "1".to_string()),
                ("language".to_string(), "en".to_string()),
                ("format".to_string(), "json".to_string()),
            ]
        );
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_forecast_url_interpolates_numbers() {
        let url = client().forecast_url(Coordinates {
            latitude: 48.85,
            longitude: 2.35,
        });
        assert_eq!(
            url.query(),
            Some("latitude=48.85&longitude=2.35&current=temperature_2m%2Cwind_speed_10m")
        );
    }

    #[test]
    fn test_forecast_url_without_current() {
        let client =
            OpenMeteoClient::new(&WeatherConfig::default().with_current(Vec::<String>::new()))
                .unwrap();
        let url = client.forecast_url(Coordinates {
            latitude: -33.87,
            longitude: 151.21,
        });
        assert_eq!(url.query(), Some("latitude=-33.87&longitude=151.21"));
    }

    #[test]
    fn test_first_result_extraction() {
        let body = json!({"results": [
            {"name": "Paris", "latitude": 48.85, "longitude": 2.35},
            {"name": "Paris", "latitude": 33.66, "longitude": -95.55},
        ]});
        assert_eq!(
            first_result(&body, "Paris").unwrap(),
            Coordinates {
                latitude: 48.85,
                longitude: 2.35
            }
        );
    }

    #[test]
    fn test_first_result_failures() {
        let kind = |body: Value| first_result(&body, "X").unwrap_err().kind;
        assert_eq!(kind(json!({})), ToolErrorKind::NotFound);
        assert_eq!(kind(json!({"results": []})), ToolErrorKind::NotFound);
        assert_eq!(kind(json!({"results": null})), ToolErrorKind::NotFound);
        assert_eq!(kind(json!({"results": "nope"})), ToolErrorKind::MalformedResponse);
        assert_eq!(
            kind(json!({"results": [{"latitude": "48.85", "longitude": 2.35}]})),
            ToolErrorKind::MalformedResponse
        );
        assert_eq!(kind(json!([1, 2])), ToolErrorKind::MalformedResponse);
    }
}

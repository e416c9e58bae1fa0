use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use wxmcp::{
    ParamType, ParameterSchema, ServerCtx, ToolDefinition, ToolError, ToolHandler, ToolResult,
    ValidationReason,
    schema::{CallToolResult, LoggingLevel, ToolAnnotations},
};

use crate::client::WeatherApi;

/// Registered tool name.
pub const TOOL_NAME: &str = "fetch-weather";

/// Arguments accepted by `fetch-weather`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherParams {
    /// City to look up.
    pub city: String,
}

/// The `fetch-weather` tool: geocode a city, then fetch its forecast.
#[derive(Debug, Clone)]
pub struct FetchWeather<A> {
    api: A,
}

impl<A: WeatherApi> FetchWeather<A> {
    /// Create the tool over a weather provider.
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: WeatherApi> ToolHandler for FetchWeather<A> {
    type Params = WeatherParams;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(TOOL_NAME, "Tool to fetch the weather from a city")
            .with_parameters(ParameterSchema::new().required(
                "city",
                ParamType::String,
                "The city to fetch the weather for",
            ))
            .with_annotations(ToolAnnotations::default().read_only().open_world())
    }

    async fn call(&self, ctx: &ServerCtx, params: WeatherParams) -> ToolResult {
        let city = params.city.trim();
        if city.is_empty() {
            return Err(ToolError::validation(
                "city",
                ValidationReason::Invalid("must not be blank".to_string()),
            ));
        }

        ctx.log(
            LoggingLevel::Debug,
            Some(TOOL_NAME),
            format!("Looking up {city}"),
        )
        .ok();
        let coordinates = self.api.geocode(city).await?;
        debug!("Resolved {} to {}", city, coordinates);

        ctx.log(
            LoggingLevel::Debug,
            Some(TOOL_NAME),
            format!("Fetching forecast for {coordinates}"),
        )
        .ok();
        let forecast = self.api.forecast(coordinates).await?;

        let text = serde_json::to_string_pretty(&forecast)
            .map_err(|e| ToolError::internal(format!("Failed to render forecast: {e}")))?;
        let mut result = CallToolResult::new().with_text_content(text);
        if matches!(forecast, Value::Object(_)) {
            result = result.with_structured_content(forecast);
        }
        Ok(result)
    }
}

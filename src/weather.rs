//! Raw provider data and the clients that fetch it.
//!
//! Everything in here is shaped like the provider's response. Mapping into the
//! shared vocabulary happens in [`crate::normalize`].

use std::time::Duration;

use time::format_description::well_known::Rfc3339;

use crate::error::FetchError;

pub mod nws;
pub mod openweather;

pub use nws::NationalWeatherService;
pub use openweather::OpenWeather;

/// Upper bound on any single request, well inside the refresh interval.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[allow(async_fn_in_trait)]
pub trait CurrentConditionsProvider {
    async fn fetch_current(&self) -> Result<RawCurrentReading, FetchError>;
}

#[allow(async_fn_in_trait)]
pub trait ForecastProvider {
    /// Forecast periods in the order the provider returned them (nearest first).
    async fn fetch_forecast(&self) -> Result<Vec<RawForecastPeriod>, FetchError>;
}

pub fn http_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(user_agent)
        .build()
}

/// Send a request and parse the body as JSON. Any non-2xx status is an error carrying the body.
pub(crate) async fn get_json(
    request: reqwest::RequestBuilder,
) -> Result<(u16, json::JsonValue), FetchError> {
    let response = request.send().await.map_err(FetchError::transport)?;
    let status = response.status().as_u16();
    let body = check_response(status, response.text().await)?;

    json::parse(&body)
        .map(|json| (status, json))
        .map_err(|e| FetchError::status(status, format!("Invalid JSON: {}", e)))
}

/// Once a status line has arrived, an error status wins over a body that failed to read.
fn check_response<E: ToString>(status: u16, body: Result<String, E>) -> Result<String, FetchError> {
    match body {
        Ok(body) if (200..300).contains(&status) => Ok(body),
        Err(e) if (200..300).contains(&status) => Err(FetchError::transport(e)),
        body => Err(FetchError::status(status, body.unwrap_or_default())),
    }
}

/// ```json
/// {
///     "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
///     "main": { "temp": 72.3, "feels_like": 71.9, "humidity": 40 },
///     "cod": 200
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RawCurrentReading {
    /// Degrees Fahrenheit.
    pub temperature: f32,
    /// OpenWeather icon code, e.g. `01d` or `10n`.
    pub condition: String,
    pub status: u16,
}

impl RawCurrentReading {
    pub fn parse(status: u16, mut json: json::JsonValue) -> Result<Self, &'static str> {
        Ok(Self {
            temperature: json["main"]["temp"]
                .as_f32()
                .ok_or("Missing or invalid \"main.temp\" value.")?,
            condition: json
                .remove("weather")
                .members_mut()
                .next()
                .ok_or("Empty \"weather\" value.")?
                .remove("icon")
                .take_string()
                .ok_or("Missing or invalid \"weather[0].icon\" value.")?,
            status,
        })
    }
}

/// ```json
/// {
///     "number": 1,
///     "name": "This Afternoon",
///     "startTime": "2024-05-01T14:00:00-04:00",
///     "isDaytime": true,
///     "temperature": 71,
///     "temperatureUnit": "F",
///     "icon": "https://api.weather.gov/icons/land/day/sct?size=medium"
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RawForecastPeriod {
    pub name: String,
    pub start_time: time::OffsetDateTime,
    pub temperature: i32,
    pub is_daytime: bool,
    pub icon: String,
}

impl TryFrom<json::JsonValue> for RawForecastPeriod {
    type Error = &'static str;

    fn try_from(mut json: json::JsonValue) -> Result<Self, Self::Error> {
        Ok(Self {
            name: json
                .remove("name")
                .take_string()
                .ok_or("Missing or invalid \"name\" value.")?,
            start_time: time::OffsetDateTime::parse(
                json["startTime"]
                    .as_str()
                    .ok_or("Missing or invalid \"startTime\" value.")?,
                &Rfc3339,
            )
            .map_err(|_| "Unparsable \"startTime\" value.")?,
            temperature: json["temperature"]
                .as_i32()
                .ok_or("Missing or invalid \"temperature\" value.")?,
            is_daytime: json["isDaytime"]
                .as_bool()
                .ok_or("Missing or invalid \"isDaytime\" value.")?,
            icon: json
                .remove("icon")
                .take_string()
                .ok_or("Missing or invalid \"icon\" value.")?,
        })
    }
}

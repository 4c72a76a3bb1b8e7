use super::{get_json, ForecastProvider, RawForecastPeriod};
use crate::error::FetchError;

/// Forecast periods from the US National Weather Service API.
///
/// The NWS serves forecasts per grid cell, so every fetch first asks the `points` endpoint which
/// forecast URL covers our coordinates and then fetches that URL.
pub struct NationalWeatherService {
    client: reqwest::Client,
    latitude: f64,
    longitude: f64,
}

impl NationalWeatherService {
    const ENDPOINT: &'static str = "https://api.weather.gov";

    pub fn new(client: reqwest::Client, latitude: f64, longitude: f64) -> Self {
        Self {
            client,
            latitude,
            longitude,
        }
    }

    /// The points endpoint redirects (301) when given more than four decimal places.
    fn points_url(&self) -> String {
        format!(
            "{}/points/{:.4},{:.4}",
            Self::ENDPOINT,
            self.latitude,
            self.longitude
        )
    }

    async fn resolve_forecast_url(&self) -> Result<String, FetchError> {
        let (status, mut json) = get_json(self.client.get(self.points_url())).await?;

        json["properties"]
            .remove("forecast")
            .take_string()
            .ok_or_else(|| {
                FetchError::status(status, "Missing or invalid \"properties.forecast\" value.")
            })
    }
}

impl ForecastProvider for NationalWeatherService {
    async fn fetch_forecast(&self) -> Result<Vec<RawForecastPeriod>, FetchError> {
        let forecast_url = self.resolve_forecast_url().await?;
        let (status, json) = get_json(self.client.get(&forecast_url)).await?;

        parse_periods(json).map_err(|e| FetchError::status(status, e))
    }
}

fn parse_periods(mut json: json::JsonValue) -> Result<Vec<RawForecastPeriod>, &'static str> {
    let mut periods = json["properties"].remove("periods");

    if !periods.is_array() {
        return Err("Missing or invalid \"properties.periods\" value.");
    }

    periods
        .members_mut()
        .map(|e| RawForecastPeriod::try_from(e.take()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_url_is_truncated_to_four_places() {
        let nws = NationalWeatherService::new(reqwest::Client::new(), 40.712_776, -74.005_974);
        assert_eq!(
            "https://api.weather.gov/points/40.7128,-74.0060",
            nws.points_url()
        );
    }

    #[test]
    fn periods_keep_response_order() {
        let json = json::parse(
            r#"{
                "properties": {
                    "periods": [
                        { "name": "This Afternoon", "startTime": "2024-05-01T14:00:00-04:00",
                          "isDaytime": true, "temperature": 71,
                          "icon": "https://api.weather.gov/icons/land/day/sct?size=medium" },
                        { "name": "Tonight", "startTime": "2024-05-01T18:00:00-04:00",
                          "isDaytime": false, "temperature": 50,
                          "icon": "https://api.weather.gov/icons/land/night/few?size=medium" },
                        { "name": "Thursday", "startTime": "2024-05-02T06:00:00-04:00",
                          "isDaytime": true, "temperature": 68,
                          "icon": "https://api.weather.gov/icons/land/day/tsra,40?size=medium" }
                    ]
                }
            }"#,
        )
        .unwrap();

        let periods = parse_periods(json).unwrap();
        assert_eq!(
            vec!["This Afternoon", "Tonight", "Thursday"],
            periods.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        );
        assert_eq!(
            vec![71, 50, 68],
            periods.iter().map(|p| p.temperature).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn missing_periods_is_an_error() {
        let json = json::parse(r#"{ "properties": {} }"#).unwrap();
        assert_eq!(
            Err("Missing or invalid \"properties.periods\" value."),
            parse_periods(json)
        );
    }

    #[test]
    fn one_bad_period_fails_the_whole_forecast() {
        let json = json::parse(
            r#"{ "properties": { "periods": [
                { "name": "Today", "startTime": "2024-05-01T06:00:00-04:00",
                  "isDaytime": true, "temperature": 70, "icon": "x" },
                { "name": "Tonight", "startTime": "2024-05-01T18:00:00-04:00",
                  "isDaytime": false, "icon": "x" }
            ] } }"#,
        )
        .unwrap();

        assert_eq!(
            Err("Missing or invalid \"temperature\" value."),
            parse_periods(json)
        );
    }
}

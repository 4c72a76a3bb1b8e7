use reqwest::Url;

use super::{get_json, CurrentConditionsProvider, RawCurrentReading};
use crate::error::FetchError;

/// Current conditions from the OpenWeather "current weather" endpoint.
pub struct OpenWeather {
    client: reqwest::Client,
    latitude: f64,
    longitude: f64,
    api_key: String,
}

impl OpenWeather {
    const ENDPOINT: &'static str = "https://api.openweathermap.org/data/2.5/weather";

    pub fn new(client: reqwest::Client, latitude: f64, longitude: f64, api_key: String) -> Self {
        Self {
            client,
            latitude,
            longitude,
            api_key,
        }
    }

    fn url(&self) -> Result<Url, FetchError> {
        Url::parse_with_params(
            Self::ENDPOINT,
            &[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("lang", "en".to_string()),
                ("units", "imperial".to_string()),
            ],
        )
        .map_err(FetchError::transport)
    }
}

impl CurrentConditionsProvider for OpenWeather {
    async fn fetch_current(&self) -> Result<RawCurrentReading, FetchError> {
        let (status, json) = get_json(self.client.get(self.url()?)).await?;

        RawCurrentReading::parse(status, json).map_err(|e| FetchError::status(status, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_coordinates_and_units() {
        let client = OpenWeather::new(reqwest::Client::new(), 40.7128, -74.006, "k3y".into());
        let url = client.url().unwrap();

        assert_eq!("api.openweathermap.org", url.host_str().unwrap());
        assert_eq!("/data/2.5/weather", url.path());

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            vec![
                ("lat".to_string(), "40.7128".to_string()),
                ("lon".to_string(), "-74.006".to_string()),
                ("appid".to_string(), "k3y".to_string()),
                ("lang".to_string(), "en".to_string()),
                ("units".to_string(), "imperial".to_string()),
            ],
            query,
        );
    }
}

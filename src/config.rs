use std::path::PathBuf;

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
    pub icon_dir: PathBuf,
    pub font_family: String,
    pub user_agent: String,
}

impl Config {
    pub const DEFAULT_ICON_DIR: &'static str = "icons";
    pub const DEFAULT_FONT_FAMILY: &'static str = "Lora";

    /// Read settings from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is fine, the variables may come from the service unit instead.
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let coordinate = |key: &'static str, limit: f64| -> Result<f64, ConfigError> {
            let value = required(key)?;
            match value.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() && parsed.abs() <= limit => Ok(parsed),
                _ => Err(ConfigError::Invalid { key, value }),
            }
        };

        Ok(Self {
            latitude: coordinate("LATITUDE", 90.)?,
            longitude: coordinate("LONGITUDE", 180.)?,
            api_key: required("API_KEY")?,
            icon_dir: lookup("ICON_DIR")
                .filter(|dir| !dir.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_ICON_DIR.to_string())
                .into(),
            font_family: lookup("FONT_FAMILY")
                .filter(|family| !family.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_FONT_FAMILY.to_string()),
            user_agent: lookup("USER_AGENT")
                .filter(|agent| !agent.is_empty())
                .unwrap_or_else(|| {
                    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
                }),
        })
    }
}

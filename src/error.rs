use thiserror::Error;

use crate::normalize::IconCategory;

/// A provider request that did not produce usable data. `code` is the HTTP status when the
/// server answered at all; transport failures and timeouts carry `None`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("fetch failed ({}): {body}", status_text(.code))]
pub struct FetchError {
    pub code: Option<u16>,
    pub body: String,
}

impl FetchError {
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            body: body.into(),
        }
    }

    pub fn transport(error: impl ToString) -> Self {
        Self {
            code: None,
            body: error.to_string(),
        }
    }
}

fn status_text(code: &Option<u16>) -> String {
    code.map_or_else(|| "no response".to_string(), |code| code.to_string())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("need at least 3 forecast periods, got {available}")]
pub struct InsufficientDataError {
    pub available: usize,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no icon asset for \"{}\"", .category.name())]
pub struct AssetMissingError {
    pub category: IconCategory,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    AssetMissing(#[from] AssetMissingError),

    #[error("drawing backend failed: {0}")]
    Backend(#[from] piet::Error),

    #[error("unable to quantize image: {0}")]
    Quantize(String),

    #[error("unable to rasterize icon: {0}")]
    Icon(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Everything that can end a poll cycle early.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("current conditions: {0}")]
    Current(FetchError),

    #[error("forecast: {0}")]
    Forecast(FetchError),

    #[error("both providers failed; current conditions: {0}; forecast: {1}")]
    Providers(FetchError, FetchError),

    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    #[error("render: {0}")]
    Render(#[from] RenderError),

    #[error("display: {0}")]
    Display(String),
}

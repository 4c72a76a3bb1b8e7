//! Reconciles both providers into one vocabulary.
//!
//! Provider-specific codes stop here: everything downstream of [`build_snapshot`] only sees
//! [`IconCategory`] and [`DateDescriptor`].

use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::InsufficientDataError;
use crate::weather::{RawCurrentReading, RawForecastPeriod};

/// Number of forecast cards on the panel.
pub const FORECAST_SLOTS: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IconCategory {
    ClearDay,
    ClearNight,
    PartlyCloudy,
    Cloudy,
    Rain,
    Thunderstorm,
    Snow,
    Haze,
    Unknown,
}

impl IconCategory {
    pub const ALL: [Self; 9] = [
        Self::ClearDay,
        Self::ClearNight,
        Self::PartlyCloudy,
        Self::Cloudy,
        Self::Rain,
        Self::Thunderstorm,
        Self::Snow,
        Self::Haze,
        Self::Unknown,
    ];

    /// Asset name, also used in log messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClearDay => "clear-day",
            Self::ClearNight => "clear-night",
            Self::PartlyCloudy => "partly-cloudy",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Thunderstorm => "thunderstorm",
            Self::Snow => "snow",
            Self::Haze => "haze",
            Self::Unknown => "unknown",
        }
    }
}

/// `(code, category by day, category by night)`. OpenWeather codes appear without their `d`/`n`
/// suffix, NWS codes as the condition token from the icon URL.
const CONDITION_CODES: &[(&str, IconCategory, IconCategory)] = {
    use IconCategory::*;
    &[
        // OpenWeather
        ("01", ClearDay, ClearNight),
        ("02", PartlyCloudy, PartlyCloudy),
        ("03", PartlyCloudy, PartlyCloudy),
        ("04", Cloudy, Cloudy),
        ("09", Rain, Rain),
        ("10", Rain, Rain),
        ("11", Thunderstorm, Thunderstorm),
        ("13", Snow, Snow),
        ("50", Haze, Haze),
        // National Weather Service
        ("skc", ClearDay, ClearNight),
        ("few", ClearDay, ClearNight),
        ("wind_skc", ClearDay, ClearNight),
        ("wind_few", ClearDay, ClearNight),
        ("sct", PartlyCloudy, PartlyCloudy),
        ("wind_sct", PartlyCloudy, PartlyCloudy),
        ("bkn", Cloudy, Cloudy),
        ("ovc", Cloudy, Cloudy),
        ("wind_bkn", Cloudy, Cloudy),
        ("wind_ovc", Cloudy, Cloudy),
        ("rain", Rain, Rain),
        ("rain_showers", Rain, Rain),
        ("rain_showers_hi", Rain, Rain),
        ("fzra", Rain, Rain),
        ("rain_fzra", Rain, Rain),
        ("tsra", Thunderstorm, Thunderstorm),
        ("tsra_sct", Thunderstorm, Thunderstorm),
        ("tsra_hi", Thunderstorm, Thunderstorm),
        ("tornado", Thunderstorm, Thunderstorm),
        ("hurricane", Thunderstorm, Thunderstorm),
        ("tropical_storm", Thunderstorm, Thunderstorm),
        ("snow", Snow, Snow),
        ("rain_snow", Snow, Snow),
        ("rain_sleet", Snow, Snow),
        ("snow_sleet", Snow, Snow),
        ("snow_fzra", Snow, Snow),
        ("sleet", Snow, Snow),
        ("blizzard", Snow, Snow),
        ("fog", Haze, Haze),
        ("haze", Haze, Haze),
        ("smoke", Haze, Haze),
        ("dust", Haze, Haze),
    ]
};

/// Map a provider condition code onto an icon category. Unrecognized codes are logged and
/// become [`IconCategory::Unknown`].
pub fn to_icon_category(code: &str, is_daytime: bool) -> IconCategory {
    match CONDITION_CODES.iter().find(|(known, _, _)| *known == code) {
        Some((_, day, _)) if is_daytime => *day,
        Some((_, _, night)) => *night,
        None => {
            log::error!("No icon category for condition code {:?}", code);
            IconCategory::Unknown
        }
    }
}

/// OpenWeather icons look like `10d`/`10n`; the suffix is the day/night flag.
fn split_openweather_code(code: &str) -> (&str, bool) {
    match code.strip_suffix('n') {
        Some(family) => (family, false),
        None => (code.strip_suffix('d').unwrap_or(code), true),
    }
}

/// NWS icon URLs look like `.../icons/land/night/rain_showers,30/tsra,60?size=medium`. The first
/// condition after the day/night segment is the one we show.
fn nws_condition(icon_url: &str) -> Option<&str> {
    let path = icon_url.split('?').next()?;
    let mut segments = path.split('/');
    segments.find(|segment| *segment == "day" || *segment == "night")?;

    segments
        .next()
        .and_then(|condition| condition.split(',').next())
        .filter(|condition| !condition.is_empty())
}

fn forecast_icon(period: &RawForecastPeriod) -> IconCategory {
    match nws_condition(&period.icon) {
        Some(code) => to_icon_category(code, period.is_daytime),
        None => {
            log::error!("No condition code in forecast icon {:?}", period.icon);
            IconCategory::Unknown
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DateDescriptor {
    Today,
    Tonight,
    Tomorrow,
    Unknown,
}

impl DateDescriptor {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Tonight => "Tonight",
            Self::Tomorrow => "Tomorrow",
            Self::Unknown => "Unknown",
        }
    }
}

/// Describe `target` relative to `today`. Anything past tomorrow has no agreed wording yet, so it
/// is logged and reported as [`DateDescriptor::Unknown`] rather than guessed.
pub fn describe_date(today: Date, target: Date, is_daytime: bool) -> DateDescriptor {
    if target == today {
        if is_daytime {
            DateDescriptor::Today
        } else {
            DateDescriptor::Tonight
        }
    } else if today.next_day() == Some(target) {
        DateDescriptor::Tomorrow
    } else {
        log::error!(
            "No date descriptor for {} relative to {} (daytime: {})",
            target,
            today,
            is_daytime
        );
        DateDescriptor::Unknown
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CurrentSummary {
    /// Degrees Fahrenheit.
    pub temperature: f32,
    pub icon: IconCategory,
    /// Local time of the reading, e.g. `Wed May 1, 3:04 PM`.
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForecastSlot {
    pub date: Date,
    pub descriptor: DateDescriptor,
    /// `High (F)` for daytime periods, `Low (F)` for overnight ones.
    pub subtitle: &'static str,
    pub temperature: i32,
    pub icon: IconCategory,
}

impl ForecastSlot {
    /// Short date, e.g. `Wed 5/1`.
    pub fn date_label(&self) -> String {
        self.date
            .format(format_description!(
                "[weekday repr:short] [month repr:numerical padding:none]/[day padding:none]"
            ))
            .unwrap_or_else(|e| {
                log::error!("Unable to format {}: {}", self.date, e);
                self.date.to_string()
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeatherSnapshot {
    pub current: CurrentSummary,
    pub forecast: [ForecastSlot; FORECAST_SLOTS],
}

/// Combine one reading from each provider. Only the first three forecast periods are used.
///
/// `now` is interpreted in the UTC offset of the first forecast period, i.e. the forecast
/// location's local time, when deciding what "today" is.
pub fn build_snapshot(
    current: &RawCurrentReading,
    forecast: &[RawForecastPeriod],
    now: OffsetDateTime,
) -> Result<WeatherSnapshot, InsufficientDataError> {
    let [first, second, third] = match forecast {
        [first, second, third, ..] => [first, second, third],
        _ => {
            return Err(InsufficientDataError {
                available: forecast.len(),
            })
        }
    };

    let local_now = now.to_offset(first.start_time.offset());
    let today = local_now.date();

    let (code, is_daytime) = split_openweather_code(&current.condition);

    let slot = |period: &RawForecastPeriod| ForecastSlot {
        date: period.start_time.date(),
        descriptor: describe_date(today, period.start_time.date(), period.is_daytime),
        subtitle: if period.is_daytime {
            "High (F)"
        } else {
            "Low (F)"
        },
        temperature: period.temperature,
        icon: forecast_icon(period),
    };

    Ok(WeatherSnapshot {
        current: CurrentSummary {
            temperature: current.temperature,
            icon: to_icon_category(code, is_daytime),
            label: local_now
                .format(format_description!(
                    "[weekday repr:short] [month repr:short] [day padding:none], [hour repr:12 padding:none]:[minute] [period]"
                ))
                .unwrap_or_else(|e| {
                    log::error!("Unable to format {}: {}", local_now, e);
                    local_now.to_string()
                }),
        },
        forecast: [slot(first), slot(second), slot(third)],
    })
}

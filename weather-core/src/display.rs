//! Human-readable rendering of a [`WeatherRecord`].

use chrono::DateTime;
use serde::Serialize;

use crate::model::WeatherRecord;

/// Rain volume (mm over the last hour) treated as 100% intensity.
const HEAVY_RAIN_MM_PER_HOUR: f64 = 100.0;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/w";

/// Display strings for one record, ready to be dropped into a UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub place: String,
    pub temperature: String,
    pub humidity: String,
    pub wind: String,
    pub condition: String,
    pub date: String,
    pub rain_intensity: String,
    pub icon_url: String,
}

impl From<&WeatherRecord> for WeatherView {
    fn from(record: &WeatherRecord) -> Self {
        let units = record.unit_system;

        let wind = match (record.wind_speed, record.wind_direction) {
            (Some(speed), Some(deg)) => format!("{speed:.1} {} at {deg:.0}°", units.speed_suffix()),
            (Some(speed), None) => format!("{speed:.1} {}", units.speed_suffix()),
            (None, Some(deg)) => format!("-- {} at {deg:.0}°", units.speed_suffix()),
            (None, None) => "--".to_string(),
        };

        Self {
            place: record.place_name.clone(),
            temperature: format!("{:.1} {}", record.temperature, units.temperature_suffix()),
            humidity: format!("{}%", record.humidity),
            wind,
            condition: record.condition_summary.clone(),
            date: format_observed_at(record.observed_at_epoch_seconds),
            rain_intensity: rain_intensity(record.precipitation_last_hour),
            icon_url: icon_url(&record.condition_icon_id),
        }
    }
}

pub fn icon_url(icon_id: &str) -> String {
    format!("{ICON_BASE_URL}/{icon_id}.png")
}

/// `Tue, 14 November` style date, UTC.
pub fn format_observed_at(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(|dt| dt.format("%a, %d %B").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn rain_intensity(mm_last_hour: Option<f64>) -> String {
    match mm_last_hour {
        Some(mm) => format!("{:.1}%", mm / HEAVY_RAIN_MM_PER_HOUR * 100.0),
        None => "0%".to_string(),
    }
}

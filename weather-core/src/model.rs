use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic position of the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Unit system requested from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Query token understood by the remote service.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

/// One request to the weather service, built per cycle and dropped afterwards.
#[derive(Debug, Clone)]
pub struct WeatherQuery {
    pub place_name: Option<String>,
    pub coordinate: Coordinate,
    pub unit_system: UnitSystem,
    pub credentials_key: String,
}

/// Snapshot of a successful query, already expressed in the requested units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub place_name: String,
    pub unit_system: UnitSystem,
    pub temperature: f64,
    pub humidity: u8,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub condition_summary: String,
    pub condition_icon_id: String,
    pub observed_at_epoch_seconds: i64,
    /// Rain volume over the last hour in mm; `None` when the service sent no rain data.
    pub precipitation_last_hour: Option<f64>,
}

/// Why a cycle ended without a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    PermissionDenied,
    NoConnectivity,
    LocationUnavailable,
    RemoteError { status: u16 },
    MalformedResponse,
    Network,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::PermissionDenied => {
                f.write_str("Location permission required to fetch weather data")
            }
            FailureReason::NoConnectivity => f.write_str("Internet connection not available"),
            FailureReason::LocationUnavailable => f.write_str("Location not available"),
            FailureReason::RemoteError { status } => {
                write!(f, "Failed to fetch weather data (service returned HTTP {status})")
            }
            FailureReason::MalformedResponse => {
                f.write_str("Failed to fetch weather data (unexpected response format)")
            }
            FailureReason::Network => f.write_str("Failed to fetch weather data (network error)"),
        }
    }
}

/// The value published to observers at the end of every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success(WeatherRecord),
    Failure(FailureReason),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn record(&self) -> Option<&WeatherRecord> {
        match self {
            FetchOutcome::Success(record) => Some(record),
            FetchOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure(reason) => Some(reason),
        }
    }
}

//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The collaborators of a weather cycle: device location, reverse
//!   geocoding, the remote weather query, permission/connectivity checks
//! - [`WeatherOrchestrator`], which runs cycles and publishes a single
//!   observable [`FetchOutcome`] (newest request wins)
//! - Display formatting of a [`WeatherRecord`]
//!
//! It is used by `weather-cli`, but can also be embedded in any front end
//! that can subscribe to a `tokio::sync::watch` channel.

pub mod config;
pub mod display;
pub mod geocode;
pub mod location;
pub mod model;
pub mod orchestrator;
pub mod platform;
pub mod provider;

pub use config::{Config, LocationConfig};
pub use display::WeatherView;
pub use geocode::{OpenWeatherGeocoder, PlaceResolver, ResolutionFailure};
pub use location::{LastKnownLocation, LocationError, LocationProvider};
pub use model::{
    Coordinate, FailureReason, FetchOutcome, UnitSystem, WeatherQuery, WeatherRecord,
};
pub use orchestrator::{Collaborators, CyclePhase, WeatherOrchestrator};
pub use platform::{ConnectivityCheck, PermissionCheck, TcpProbe};
pub use provider::{ClientError, WeatherClient, openweather::OpenWeatherClient};

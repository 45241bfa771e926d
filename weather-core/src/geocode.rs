//! Reverse geocoding: turn a coordinate into a locality name.
//! Uses the OpenWeather geocoding endpoint with the same credential as the weather query.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tracing::instrument;

use crate::model::Coordinate;

pub const DEFAULT_GEOCODE_URL: &str = "https://api.openweathermap.org/geo/1.0/reverse";

/// Why a place name could not be produced. None of these abort a weather fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionFailure {
    #[error("No place found for the given coordinates")]
    NoResults,
    #[error("Geocoding request failed: {0}")]
    Transport(String),
    #[error("Geocoding service returned status {0}")]
    Http(u16),
    #[error("Failed to parse geocoding response: {0}")]
    Decode(String),
}

impl ResolutionFailure {
    /// `true` when the lookup worked but simply had nothing to offer.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, ResolutionFailure::NoResults)
    }
}

#[async_trait]
pub trait PlaceResolver: Send + Sync + Debug {
    async fn resolve(&self, coordinate: Coordinate) -> Result<String, ResolutionFailure>;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherGeocoder {
    api_key: String,
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct GeoCandidate {
    name: Option<String>,
}

impl OpenWeatherGeocoder {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_GEOCODE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl PlaceResolver for OpenWeatherGeocoder {
    #[instrument(skip(self), level = "debug")]
    async fn resolve(&self, coordinate: Coordinate) -> Result<String, ResolutionFailure> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
                ("limit", "1".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| ResolutionFailure::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(ResolutionFailure::Http(status.as_u16()));
        }

        let body = res
            .text()
            .await
            .map_err(|e| ResolutionFailure::Transport(e.to_string()))?;

        let candidates: Vec<GeoCandidate> =
            serde_json::from_str(&body).map_err(|e| ResolutionFailure::Decode(e.to_string()))?;

        // Only the first candidate counts; an unnamed first candidate is the same as none.
        let name = candidates
            .into_iter()
            .next()
            .and_then(|c| c.name)
            .filter(|n| !n.trim().is_empty())
            .ok_or(ResolutionFailure::NoResults)?;

        tracing::debug!("Reverse geocoded {} to {}", coordinate, name);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder(server: &MockServer) -> OpenWeatherGeocoder {
        OpenWeatherGeocoder::with_base_url("KEY".to_string(), format!("{}/reverse", server.uri()))
    }

    #[tokio::test]
    async fn takes_first_candidate_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("appid", "KEY"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "Paris", "country": "FR", "lat": 48.85, "lon": 2.35 },
                { "name": "Lutetia", "country": "FR", "lat": 48.85, "lon": 2.35 }
            ])))
            .mount(&server)
            .await;

        let name = geocoder(&server)
            .resolve(Coordinate::new(48.85, 2.35))
            .await
            .unwrap();
        assert_eq!(name, "Paris");
    }

    #[tokio::test]
    async fn empty_candidate_list_is_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = geocoder(&server)
            .resolve(Coordinate::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(err.is_empty_result());
    }

    #[tokio::test]
    async fn http_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = geocoder(&server)
            .resolve(Coordinate::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionFailure::Http(401));
        assert!(!err.is_empty_result());
    }

    #[tokio::test]
    async fn garbage_body_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = geocoder(&server)
            .resolve(Coordinate::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionFailure::Decode(_)));
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::model::{WeatherQuery, WeatherRecord};

use super::{ClientError, WeatherClient};

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    http: Client,
}

impl Default for OpenWeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenWeatherClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_WEATHER_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url,
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<String>,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    rain: Option<OwRain>,
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip(self, query), fields(units = %query.unit_system, place = ?query.place_name))]
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, ClientError> {
        let mut params = vec![
            ("lat", query.coordinate.latitude.to_string()),
            ("lon", query.coordinate.longitude.to_string()),
            ("appid", query.credentials_key.clone()),
            ("units", query.unit_system.as_str().to_string()),
        ];
        if let Some(place) = &query.place_name {
            params.push(("q", place.clone()));
        }

        let res = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        parse_current(&body, query)
    }
}

fn parse_current(body: &str, query: &WeatherQuery) -> Result<WeatherRecord, ClientError> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))?;

    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::Decode("response contained no weather condition".into()))?;

    let place_name = parsed
        .name
        .filter(|n| !n.is_empty())
        .or_else(|| query.place_name.clone())
        .unwrap_or_else(|| query.coordinate.to_string());

    Ok(WeatherRecord {
        place_name,
        unit_system: query.unit_system,
        temperature: parsed.main.temp,
        humidity: parsed.main.humidity,
        wind_speed: parsed.wind.speed,
        wind_direction: parsed.wind.deg,
        condition_summary: condition.main,
        condition_icon_id: condition.icon,
        observed_at_epoch_seconds: parsed.dt,
        precipitation_last_hour: parsed.rain.and_then(|r| r.one_hour),
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, UnitSystem};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(units: UnitSystem, place: Option<&str>) -> WeatherQuery {
        WeatherQuery {
            place_name: place.map(str::to_string),
            coordinate: Coordinate::new(48.85, 2.35),
            unit_system: units,
            credentials_key: "KEY".to_string(),
        }
    }

    fn paris_body() -> serde_json::Value {
        serde_json::json!({
            "main": { "temp": 21.3, "humidity": 55 },
            "wind": { "deg": 10 },
            "weather": [{ "main": "Clouds", "icon": "04d" }],
            "name": "Paris",
            "dt": 1700000000
        })
    }

    #[tokio::test]
    async fn parses_current_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "KEY"))
            .and(query_param("q", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(paris_body()))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::with_base_url(format!("{}/weather", server.uri()));
        let record = client
            .fetch(&query(UnitSystem::Metric, Some("Paris")))
            .await
            .unwrap();

        assert!((record.temperature - 21.3).abs() < 1e-9);
        assert_eq!(record.humidity, 55);
        assert_eq!(record.condition_summary, "Clouds");
        assert_eq!(record.condition_icon_id, "04d");
        assert_eq!(record.place_name, "Paris");
        assert_eq!(record.observed_at_epoch_seconds, 1_700_000_000);
        assert_eq!(record.wind_direction, Some(10.0));
        assert_eq!(record.wind_speed, None);
        assert_eq!(record.precipitation_last_hour, None);
    }

    #[tokio::test]
    async fn reads_rain_volume_when_present() {
        let mut body = paris_body();
        body["rain"] = serde_json::json!({ "1h": 2.5 });

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::with_base_url(server.uri());
        let record = client.fetch(&query(UnitSystem::Metric, None)).await.unwrap();
        assert_eq!(record.precipitation_last_hour, Some(2.5));
    }

    #[tokio::test]
    async fn missing_temperature_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "main": { "humidity": 55 },
                "weather": [{ "main": "Clouds", "icon": "04d" }],
                "name": "Paris",
                "dt": 1700000000
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::with_base_url(server.uri());
        let err = client.fetch(&query(UnitSystem::Metric, None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_condition_list_is_decode_error() {
        let mut body = paris_body();
        body["weather"] = serde_json::json!([]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::with_base_url(server.uri());
        let err = client.fetch(&query(UnitSystem::Metric, None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn condition_without_icon_is_decode_error() {
        let body = r#"{"main":{"temp":1.0,"humidity":10},"weather":[{"main":"Clear"}],"dt":1}"#;
        let err = parse_current(body, &query(UnitSystem::Metric, None)).unwrap_err();
        assert!(matches!(err, ClientError::Decode(msg) if msg.contains("icon")));
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"cod\":401}"))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::with_base_url(server.uri());
        let err = client.fetch(&query(UnitSystem::Metric, None)).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Http {
                status: 401,
                body: "{\"cod\":401}".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Nothing listens on the discard port.
        let client = OpenWeatherClient::with_base_url("http://127.0.0.1:9/weather".to_string());
        let err = client.fetch(&query(UnitSystem::Metric, None)).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }

    #[test]
    fn missing_name_falls_back_to_coordinate() {
        let body = r#"{"main":{"temp":1.0,"humidity":10},"weather":[{"main":"Clear","icon":"01d"}],"dt":1}"#;
        let record = parse_current(body, &query(UnitSystem::Imperial, None)).unwrap();
        assert_eq!(record.place_name, "48.8500, 2.3500");
        assert_eq!(record.unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn truncates_long_bodies() {
        let long = "x".repeat(500);
        let out = truncate_body(&long);
        assert_eq!(out.len(), 203);
        assert!(out.ends_with("..."));
    }
}

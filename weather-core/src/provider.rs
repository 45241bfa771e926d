use crate::{
    Config, WeatherQuery, WeatherRecord,
    model::FailureReason,
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Why a single weather query failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Weather service returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Failed to decode weather response: {0}")]
    Decode(String),
}

impl From<ClientError> for FailureReason {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Network(_) => FailureReason::Network,
            ClientError::Http { status, .. } => FailureReason::RemoteError { status },
            ClientError::Decode(_) => FailureReason::MalformedResponse,
        }
    }
}

/// One network call per `fetch`, never retried.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherRecord, ClientError>;
}

/// Construct the weather client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherClient>> {
    // Fail early so a missing key surfaces before any cycle starts.
    config.api_key()?;
    Ok(Arc::new(OpenWeatherClient::with_base_url(
        config.weather_url.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn client_errors_map_to_failure_reasons() {
        assert_eq!(
            FailureReason::from(ClientError::Network("refused".into())),
            FailureReason::Network
        );
        assert_eq!(
            FailureReason::from(ClientError::Http {
                status: 503,
                body: String::new()
            }),
            FailureReason::RemoteError { status: 503 }
        );
        assert_eq!(
            FailureReason::from(ClientError::Decode("missing field".into())),
            FailureReason::MalformedResponse
        );
    }

    #[test]
    fn client_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = client_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn client_from_config_works_when_configured() {
        let cfg = Config {
            api_key: Some("KEY".to_string()),
            ..Config::default()
        };
        assert!(client_from_config(&cfg).is_ok());
    }
}

//! Runs location -> place -> weather cycles and publishes their outcome.
//!
//! Every call to [`WeatherOrchestrator::request_weather`] claims a generation
//! number before any work starts. A cycle may only touch the published slots
//! while its generation is still the newest one, so a slow response from an
//! older cycle can never overwrite the result of a newer request.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    Config,
    geocode::{OpenWeatherGeocoder, PlaceResolver},
    location::{LastKnownLocation, LocationProvider},
    model::{FailureReason, FetchOutcome, UnitSystem, WeatherQuery},
    platform::{ConnectivityCheck, PermissionCheck, TcpProbe},
    provider::{WeatherClient, client_from_config},
};

/// Where the newest cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    CheckingPreconditions,
    AwaitingLocation,
    AwaitingPlace,
    AwaitingWeather,
}

impl CyclePhase {
    pub fn is_busy(&self) -> bool {
        !matches!(self, CyclePhase::Idle)
    }
}

/// Everything the orchestrator needs from the outside world.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub permission: Arc<dyn PermissionCheck>,
    pub connectivity: Arc<dyn ConnectivityCheck>,
    pub location: Arc<dyn LocationProvider>,
    pub places: Arc<dyn PlaceResolver>,
    pub weather: Arc<dyn WeatherClient>,
}

#[derive(Debug, Clone)]
pub struct WeatherOrchestrator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    deps: Collaborators,
    credentials_key: String,
    latest: AtomicU64,
    outcome: watch::Sender<Option<FetchOutcome>>,
    phase: watch::Sender<CyclePhase>,
}

impl WeatherOrchestrator {
    pub fn new(deps: Collaborators, credentials_key: String) -> Self {
        let (outcome, _) = watch::channel(None);
        let (phase, _) = watch::channel(CyclePhase::Idle);

        Self {
            inner: Arc::new(Inner {
                deps,
                credentials_key,
                latest: AtomicU64::new(0),
                outcome,
                phase,
            }),
        }
    }

    /// Wire the OpenWeather collaborators described by `config`.
    ///
    /// The returned location store doubles as the permission signal, so a
    /// caller can feed new fixes into a running orchestrator.
    pub fn from_config(config: &Config) -> anyhow::Result<(Self, Arc<LastKnownLocation>)> {
        let api_key = config.api_key()?.to_string();
        let location = Arc::new(LastKnownLocation::new(
            config.location.permission_granted,
            config.location.last_fix,
        ));

        let deps = Collaborators {
            permission: location.clone(),
            connectivity: Arc::new(TcpProbe::new(
                config.connectivity_probe.clone(),
                config.connectivity_timeout(),
            )),
            location: location.clone(),
            places: Arc::new(OpenWeatherGeocoder::with_base_url(
                api_key.clone(),
                config.geocode_url.clone(),
            )),
            weather: client_from_config(config)?,
        };

        Ok((Self::new(deps, api_key), location))
    }

    /// Subscribe to published outcomes. The receiver holds the latest outcome
    /// (or `None` before the first publication) right away.
    pub fn subscribe(&self) -> watch::Receiver<Option<FetchOutcome>> {
        self.inner.outcome.subscribe()
    }

    pub fn watch_phase(&self) -> watch::Receiver<CyclePhase> {
        self.inner.phase.subscribe()
    }

    pub fn current(&self) -> Option<FetchOutcome> {
        self.inner.outcome.borrow().clone()
    }

    /// Start a cycle in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_weather(&self, unit_system: UnitSystem) -> JoinHandle<()> {
        let generation = self.inner.claim_generation();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            inner.run(generation, unit_system).await;
        })
    }

    /// Run a cycle to completion and return its outcome.
    ///
    /// The outcome is returned even when a newer request superseded it and it
    /// was therefore not published.
    pub async fn fetch_now(&self, unit_system: UnitSystem) -> FetchOutcome {
        let generation = self.inner.claim_generation();
        self.inner.run(generation, unit_system).await
    }
}

impl Inner {
    fn claim_generation(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    async fn run(&self, generation: u64, unit_system: UnitSystem) -> FetchOutcome {
        debug!(generation, units = %unit_system, "weather cycle started");

        let outcome = self.execute(generation, unit_system).await;
        self.publish(generation, outcome.clone());
        outcome
    }

    async fn execute(&self, generation: u64, unit_system: UnitSystem) -> FetchOutcome {
        let deps = &self.deps;

        self.enter(generation, CyclePhase::CheckingPreconditions);
        if !deps.permission.location_permission_granted() {
            return FetchOutcome::Failure(FailureReason::PermissionDenied);
        }
        if !deps.connectivity.network_reachable().await {
            return FetchOutcome::Failure(FailureReason::NoConnectivity);
        }

        self.enter(generation, CyclePhase::AwaitingLocation);
        let coordinate = match deps.location.current_coordinate().await {
            Ok(coordinate) => coordinate,
            Err(e) => {
                debug!(generation, "location unavailable: {}", e);
                return FetchOutcome::Failure(FailureReason::LocationUnavailable);
            }
        };

        self.enter(generation, CyclePhase::AwaitingPlace);
        let place_name = match deps.places.resolve(coordinate).await {
            Ok(name) => Some(name),
            Err(e) if e.is_empty_result() => {
                debug!(generation, "no place name for {}, using coordinates", coordinate);
                None
            }
            Err(e) => {
                warn!(generation, "place resolution failed, using coordinates: {}", e);
                None
            }
        };

        self.enter(generation, CyclePhase::AwaitingWeather);
        let query = WeatherQuery {
            place_name,
            coordinate,
            unit_system,
            credentials_key: self.credentials_key.clone(),
        };

        match deps.weather.fetch(&query).await {
            Ok(record) => FetchOutcome::Success(record),
            Err(e) => {
                warn!(generation, "weather fetch failed: {}", e);
                FetchOutcome::Failure(e.into())
            }
        }
    }

    fn enter(&self, generation: u64, phase: CyclePhase) {
        self.phase.send_if_modified(|current| {
            if !self.is_current(generation) || *current == phase {
                return false;
            }
            *current = phase;
            true
        });
    }

    /// Replace the published outcome if this cycle is still the newest one.
    /// The generation check runs under the slot's write lock.
    fn publish(&self, generation: u64, outcome: FetchOutcome) -> bool {
        let published = self.outcome.send_if_modified(|slot| {
            if !self.is_current(generation) {
                return false;
            }
            *slot = Some(outcome);
            true
        });

        if published {
            info!(generation, "weather outcome published");
            self.enter(generation, CyclePhase::Idle);
        } else {
            debug!(generation, "discarding outcome of superseded cycle");
        }
        published
    }
}

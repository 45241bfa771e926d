//! Device location as seen by the weather pipeline.
//!
//! The pipeline never starts a positioning session itself; it only reads the
//! most recent fix the platform holds.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt::Debug;

use crate::model::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission not granted")]
    NoPermission,
    #[error("No location fix has been recorded")]
    NoFix,
}

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Best-known coordinate, without waiting for a new fix.
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError>;
}

/// Holds the last fix reported by the platform.
#[derive(Debug, Default)]
pub struct LastKnownLocation {
    state: RwLock<FixState>,
}

#[derive(Debug, Default)]
struct FixState {
    permission_granted: bool,
    last_fix: Option<Coordinate>,
}

impl LastKnownLocation {
    pub fn new(permission_granted: bool, last_fix: Option<Coordinate>) -> Self {
        Self {
            state: RwLock::new(FixState {
                permission_granted,
                last_fix,
            }),
        }
    }

    pub fn record_fix(&self, coordinate: Coordinate) {
        self.state.write().last_fix = Some(coordinate);
    }

    pub fn set_permission(&self, granted: bool) {
        self.state.write().permission_granted = granted;
    }

    pub fn permission_granted(&self) -> bool {
        self.state.read().permission_granted
    }
}

#[async_trait]
impl LocationProvider for LastKnownLocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        let state = self.state.read();
        if !state.permission_granted {
            return Err(LocationError::NoPermission);
        }
        state.last_fix.ok_or(LocationError::NoFix)
    }
}

//! Permission and connectivity signals, re-read at the start of every cycle.

use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};
use tokio::{net::TcpStream, time::timeout};

use crate::location::LastKnownLocation;

pub trait PermissionCheck: Send + Sync + Debug {
    fn location_permission_granted(&self) -> bool;
}

#[async_trait]
pub trait ConnectivityCheck: Send + Sync + Debug {
    async fn network_reachable(&self) -> bool;
}

impl PermissionCheck for LastKnownLocation {
    fn location_permission_granted(&self) -> bool {
        self.permission_granted()
    }
}

/// Treats the network as reachable when a TCP connection to `target` opens in time.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityCheck for TcpProbe {
    async fn network_reachable(&self) -> bool {
        match timeout(self.timeout, TcpStream::connect(self.target.as_str())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {} failed: {}", self.target, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe to {} timed out", self.target);
                false
            }
        }
    }
}

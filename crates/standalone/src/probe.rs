//! Readiness polling of the launched server.

use crate::error::OrchestratorError;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One readiness check against a server
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Address reported in timeout errors
    fn target(&self) -> SocketAddr;

    async fn probe(&self) -> bool;
}

/// Bare connect-then-close against a TCP port
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: SocketAddr,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
        }
    }
}

#[async_trait]
impl ReadinessProbe for TcpProbe {
    fn target(&self) -> SocketAddr {
        self.addr
    }

    async fn probe(&self) -> bool {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "Probe refused");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "Probe connect timed out");
                false
            }
        }
    }
}

/// Poll until the probe succeeds, making at most `timeout / interval`
/// attempts spaced `interval` apart. Returns the attempt that succeeded.
///
/// The whole wait, slow probes included, ends at `timeout`.
pub async fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    interval: Duration,
    timeout: Duration,
) -> Result<u32, OrchestratorError> {
    let max_attempts = max_attempts(interval, timeout);
    let deadline = Instant::now() + timeout;
    info!(
        addr = %probe.target(),
        ?interval,
        ?timeout,
        max_attempts,
        "Waiting for server readiness"
    );

    let mut attempts = 0;
    while attempts < max_attempts {
        attempts += 1;
        match tokio::time::timeout_at(deadline, probe.probe()).await {
            Ok(true) => {
                info!(addr = %probe.target(), attempt = attempts, "Server ready");
                return Ok(attempts);
            }
            Ok(false) => {}
            Err(_) => break,
        }
        if attempts < max_attempts {
            tokio::time::sleep_until((Instant::now() + interval).min(deadline)).await;
            if Instant::now() >= deadline {
                break;
            }
        }
    }

    warn!(addr = %probe.target(), attempts, "Server never became ready");
    Err(OrchestratorError::ReadinessTimeout {
        addr: probe.target(),
        attempts,
        timeout,
    })
}

fn max_attempts(interval: Duration, timeout: Duration) -> u32 {
    if interval.is_zero() {
        return 1;
    }
    let attempts = timeout.as_millis() / interval.as_millis().max(1);
    u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
}

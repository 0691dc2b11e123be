//! Pre-flight TCP reachability check.
//!
//! Runs before any channel is opened so that a TV on another subnet fails
//! fast with a classified error instead of hanging inside a protocol
//! handshake.

use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::device::DeviceAddress;
use crate::error::TvError;

/// Classified connect failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// No route to host, usually a subnet mismatch.
    Unreachable,
    /// Host answered but nothing listens on the port.
    Refused,
    TimedOut,
    Generic,
}

/// Outcome of a reachability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<FailureClass>,
    pub message: String,
}

impl ConnectivityResult {
    pub fn reachable(address: &DeviceAddress) -> Self {
        Self {
            ok: true,
            classification: None,
            message: format!("{address} is reachable"),
        }
    }

    pub fn failed(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            classification: Some(class),
            message: message.into(),
        }
    }

    /// Convert a failed result into the matching [`TvError`].
    ///
    /// Returns `None` when the check succeeded.
    pub fn into_error(self, address: &DeviceAddress) -> Option<TvError> {
        let address = address.to_string();
        let reason = self.message;
        match self.classification? {
            FailureClass::Unreachable => Some(TvError::Unreachable { address, reason }),
            FailureClass::Refused => Some(TvError::Refused { address, reason }),
            FailureClass::TimedOut => Some(TvError::TimedOut { address, reason }),
            FailureClass::Generic => Some(TvError::failed("connectivity check", reason)),
        }
    }
}

/// Reachability check run before every connection attempt.
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    async fn check(&self, address: &DeviceAddress) -> ConnectivityResult;
}

/// Plain TCP connect with a short timeout. No protocol bytes are sent.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    pub timeout: Duration,
}

impl TcpProbe {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[async_trait]
impl ConnectivityCheck for TcpProbe {
    #[instrument(skip(self), fields(address = %address))]
    async fn check(&self, address: &DeviceAddress) -> ConnectivityResult {
        let start = Instant::now();
        let target = (address.host.as_str(), address.port);

        let result = match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => ConnectivityResult::reachable(address),
            Ok(Err(e)) => {
                let class = classify_io_error(&e);
                ConnectivityResult::failed(class, describe(class, address, &e))
            }
            Err(_) => ConnectivityResult::failed(
                FailureClass::TimedOut,
                format!(
                    "no answer from {address} within {}ms",
                    self.timeout.as_millis()
                ),
            ),
        };

        debug!(
            ok = result.ok,
            classification = ?result.classification,
            duration_ms = start.elapsed().as_millis() as u64,
            "Connectivity check finished"
        );
        result
    }
}

/// Map a connect error onto a [`FailureClass`].
pub fn classify_io_error(err: &io::Error) -> FailureClass {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => FailureClass::Refused,
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            FailureClass::Unreachable
        }
        io::ErrorKind::TimedOut => FailureClass::TimedOut,
        _ => FailureClass::Generic,
    }
}

fn describe(class: FailureClass, address: &DeviceAddress, err: &io::Error) -> String {
    match class {
        FailureClass::Unreachable => format!(
            "no route to {address} ({err}); the TV is probably on a different subnet"
        ),
        FailureClass::Refused => {
            format!("{address} refused the connection ({err}); the control service is not listening")
        }
        FailureClass::TimedOut => format!("connecting to {address} timed out ({err})"),
        FailureClass::Generic => format!("cannot connect to {address}: {err}"),
    }
}

/// Probe with a fixed answer, for tests and simulated devices.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    failure: Option<(FailureClass, String)>,
}

impl StaticProbe {
    pub const fn reachable() -> Self {
        Self { failure: None }
    }

    pub fn failing(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            failure: Some((class, message.into())),
        }
    }
}

#[async_trait]
impl ConnectivityCheck for StaticProbe {
    async fn check(&self, address: &DeviceAddress) -> ConnectivityResult {
        match &self.failure {
            None => ConnectivityResult::reachable(address),
            Some((class, message)) => ConnectivityResult::failed(*class, message.clone()),
        }
    }
}

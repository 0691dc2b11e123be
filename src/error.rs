//! Error types for TV control operations.

use serde::Serialize;
use thiserror::Error;

use crate::device::ChannelError;

/// Actionable failure categories reported to callers.
///
/// Every [`TvError`] maps onto exactly one kind; this is the `errorType`
/// field of an [`OpResult`](crate::controller::OpResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No route to the device, usually a subnet mismatch.
    Unreachable,
    /// The device answered but nothing listens on the port.
    Refused,
    /// The device did not answer in time.
    TimedOut,
    /// The feature is not available on this device or firmware.
    Unsupported,
    /// Generic transport or command failure.
    OperationFailed,
    /// The caller passed a value the operation cannot accept.
    InvalidArgument,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unreachable => "unreachable",
            Self::Refused => "refused",
            Self::TimedOut => "timed_out",
            Self::Unsupported => "unsupported",
            Self::OperationFailed => "operation_failed",
            Self::InvalidArgument => "invalid_argument",
        };
        f.write_str(name)
    }
}

/// Primary error type for TV control operations.
#[derive(Error, Debug)]
pub enum TvError {
    // Connectivity errors
    #[error("Device {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Connection to {address} refused: {reason}")]
    Refused { address: String, reason: String },

    #[error("Connection to {address} timed out: {reason}")]
    TimedOut { address: String, reason: String },

    // Capability errors
    #[error("{feature} is not supported by this device")]
    Unsupported { feature: String },

    // Operation errors
    #[error("{operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },

    #[error("Uploaded image not found after {attempts} listing attempts")]
    NotFoundAfterUpload { attempts: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TvError {
    /// Wrap a transport failure that happened while running `operation`.
    ///
    /// Typed transport errors keep their classification; everything else
    /// becomes [`TvError::OperationFailed`].
    pub fn from_channel(address: &str, operation: &str, err: ChannelError) -> Self {
        match err {
            ChannelError::Unreachable(reason) | ChannelError::PairingRejected(reason) => {
                Self::Unreachable {
                    address: address.to_string(),
                    reason,
                }
            }
            ChannelError::Refused(reason) => Self::Refused {
                address: address.to_string(),
                reason,
            },
            ChannelError::TimedOut(reason) => Self::TimedOut {
                address: address.to_string(),
                reason,
            },
            ChannelError::Unsupported(feature) => Self::Unsupported { feature },
            other => Self::OperationFailed {
                operation: operation.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Shorthand for an [`TvError::OperationFailed`].
    pub fn failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Refused { .. } => ErrorKind::Refused,
            Self::TimedOut { .. } => ErrorKind::TimedOut,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::InvalidArgument(_) | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::OperationFailed { .. } | Self::NotFoundAfterUpload { .. } | Self::Io(_) => {
                ErrorKind::OperationFailed
            }
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. }
                | Self::Refused { .. }
                | Self::InvalidArgument(_)
                | Self::Config(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Unreachable { .. } => Some(
                "Check that this machine and the TV are on the same subnet; the TV silently drops cross-subnet traffic",
            ),
            Self::Refused { .. } => {
                Some("The TV is up but its control service is not listening; wake it or check the port")
            }
            Self::TimedOut { .. } => Some("Ensure the TV is powered and connected to the network"),
            Self::Unsupported { .. } => Some("This model or firmware does not offer the feature"),
            Self::NotFoundAfterUpload { .. } => {
                Some("List images to check whether the upload landed late")
            }
            Self::Config(_) => Some("Run: tvctl config"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using TvError.
pub type Result<T> = std::result::Result<T, TvError>;

//! Error types for switchbot-core.
//!
//! This module defines all error types that can occur when talking to a
//! SwitchBot Bot over Bluetooth Low Energy.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::Timeout`] | Reconnect, then retry | A late reply may still arrive on the old session |
//! | [`Error::Bluetooth`] | Retry, then reconnect | May be transient or connection lost |
//! | [`Error::NotConnected`] | Reconnect | Connection was lost |
//! | [`Error::WriteFailed`] | Retry (1-2 times) | BLE write can fail transiently |
//! | [`Error::SubscriptionFailed`] | Retry with a fresh connection | Notify setup is flaky on some stacks |
//! | [`Error::CommandRejected`] | Retry | The Bot occasionally rejects while busy |
//! | [`Error::Decode`] | Do not retry | Protocol mismatch, report to user |
//! | [`Error::SessionContaminated`] | Drain or reconnect | Responses can no longer be correlated |
//! | [`Error::DeviceNotFound`] | Do not retry | Device not in range or wrong address |
//! | [`Error::CharacteristicNotFound`] | Do not retry | Not a SwitchBot Bot |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |
//!
//! ## Using RetryConfig
//!
//! ```ignore
//! use switchbot_core::{RetryConfig, with_retry};
//!
//! let config = RetryConfig::for_command().max_retries(2);
//! let info = with_retry(&config, "get_info", || async {
//!     let mut session = Session::connect("aa:bb:cc:dd:ee:ff").await?;
//!     session.get_info().await
//! }).await?;
//! ```

use std::time::Duration;

use thiserror::Error;

use switchbot_types::{ParseError, RawResponse};

/// Errors that can occur when communicating with SwitchBot devices.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to device.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Attaching to the notify characteristic failed.
    #[error("Subscription to characteristic {uuid} failed: {reason}")]
    SubscriptionFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Write operation failed.
    #[error("Write failed to characteristic {uuid}: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The Bot answered with a non-success status byte.
    #[error("Command rejected by device (status {}, response [{response}])", display_status(.status))]
    CommandRejected {
        /// The status byte, `None` if the payload was empty.
        status: Option<u8>,
        /// The full payload, kept for diagnostics.
        response: RawResponse,
    },

    /// A response payload was too short for its decoder.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// A previous wait was abandoned and a stale reply may still be queued.
    #[error("Session contaminated by an abandoned request; drain it or reconnect")]
    SessionContaminated,

    /// The notification stream ended while a response was expected.
    #[error("Notification stream closed")]
    NotificationStreamClosed,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_status(status: &Option<u8>) -> String {
    match status {
        Some(byte) => format!("0x{:02x}", byte),
        None => "none".to_string(),
    }
}

/// Reason why a device was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// Device with specified name/address not found.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a subscription failure.
    pub fn subscription_failed(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SubscriptionFailed {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }

    /// Create a write failure.
    pub fn write_failed(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }

    /// Create a rejection error carrying the Bot's raw reply.
    pub fn command_rejected(response: RawResponse) -> Self {
        Self::CommandRejected {
            status: response.status(),
            response,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// The raw reply attached to a [`Error::CommandRejected`].
    pub fn rejected_response(&self) -> Option<&RawResponse> {
        match self {
            Self::CommandRejected { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Result type alias using switchbot-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

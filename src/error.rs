//! Error types for the gateway.
//!
//! `GatewayError` covers the few conditions that reject a request outright.
//! Most faults never become errors: a detached device degrades to an empty
//! response and a failing channel becomes a
//! [`ChannelFault`](crate::batch::ChannelFault) inside an otherwise successful
//! batch.
//!
//! ## Error Categories
//!
//! - **`LengthMismatch`**: a digital write whose channel and value lists differ
//!   in length. Rejected before any channel is written.
//! - **`ShuttingDown`**: the `exit` command was received; new batches are refused.
//! - **`Device`**: opening the device failed (serial filter matched nothing, etc.).
//! - **`Configuration`**: the configuration could not be loaded or failed
//!   validation. See [`ConfigError`].
//! - **`InvalidRequest`**: a console line could not be parsed into a request.

use ifkit_core::DeviceError;
use thiserror::Error;

/// Convenience alias for results using the gateway error type.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Primary error type for the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Channel and value sequences of a write differ in length.
    #[error("Length mismatch: {channels} channels but {values} values")]
    LengthMismatch {
        /// Channels in the request
        channels: usize,
        /// Values in the request
        values: usize,
    },

    /// Shutdown was requested; no further batches are served.
    #[error("Gateway is shutting down")]
    ShuttingDown,

    /// Device-level failure outside a batch.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Configuration could not be loaded or holds unusable values.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A request could not be parsed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File or environment could not be merged into the config structure.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value parsed but is unusable.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

impl GatewayError {
    /// Whether the caller can retry the same request later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Device(_) | Self::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_display() {
        let err = GatewayError::LengthMismatch {
            channels: 2,
            values: 1,
        };
        assert_eq!(err.to_string(), "Length mismatch: 2 channels but 1 values");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_device_error_converts() {
        let err: GatewayError = DeviceError::not_found(7).into();
        assert!(matches!(err, GatewayError::Device(_)));
        assert!(err.to_string().contains("serial 7"));
    }

    #[test]
    fn test_config_error_wraps() {
        let err: GatewayError = ConfigError::Invalid {
            field: "device.namespace",
            reason: "must not be empty".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid device.namespace: must not be empty"
        );
    }
}

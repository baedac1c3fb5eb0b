//! Error types for device operations.
//!
//! Every primitive on an [`InterfaceKit`](crate::InterfaceKit) can fail on its
//! own. [`DeviceError`] carries a coarse [`DeviceErrorKind`] so callers can
//! tell a bad channel index from a lost device without parsing messages.

use crate::device::ChannelKind;
use thiserror::Error;

/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Classification of a device failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// No device matched the requested serial number.
    NotFound,
    /// The device was detached when the call was made.
    NotAttached,
    /// Channel index outside the device's channel count.
    InvalidChannel,
    /// Transport-level failure talking to the device.
    Communication,
    /// The device reported a fault.
    Hardware,
    /// The call did not complete in time.
    Timeout,
    /// Anything the driver could not classify.
    Unknown,
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeviceErrorKind::NotFound => "not_found",
            DeviceErrorKind::NotAttached => "not_attached",
            DeviceErrorKind::InvalidChannel => "invalid_channel",
            DeviceErrorKind::Communication => "communication",
            DeviceErrorKind::Hardware => "hardware",
            DeviceErrorKind::Timeout => "timeout",
            DeviceErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// A failed device call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("InterfaceKit {kind} error: {message}")]
pub struct DeviceError {
    /// Coarse classification.
    pub kind: DeviceErrorKind,
    /// Driver-supplied detail.
    pub message: String,
}

impl DeviceError {
    /// Create an error of the given kind.
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// No device with the requested serial number could be opened.
    pub fn not_found(serial: i32) -> Self {
        Self::new(
            DeviceErrorKind::NotFound,
            format!("no InterfaceKit with serial {serial}"),
        )
    }

    /// The device is not attached.
    pub fn not_attached() -> Self {
        Self::new(DeviceErrorKind::NotAttached, "device is not attached")
    }

    /// A channel index was outside the device's range.
    pub fn invalid_channel(kind: ChannelKind, channel: u32, max: u32) -> Self {
        Self::new(
            DeviceErrorKind::InvalidChannel,
            format!("invalid {kind} channel {channel}: device has {max}"),
        )
    }

    /// The device reported a hardware fault.
    pub fn hardware(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Hardware, message)
    }

    /// Check if this error means the device went away.
    pub fn is_not_attached(&self) -> bool {
        self.kind == DeviceErrorKind::NotAttached
    }
}

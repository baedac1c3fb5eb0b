//! Device handle contract and metadata.
//!
//! An [`InterfaceKit`] exposes three banks of channels: analog inputs
//! ("sensors"), digital inputs and digital outputs. Channel counts and
//! identity are only meaningful while the device is attached; the driver
//! announces transitions as [`DeviceEvent`]s on the channel returned from
//! [`InterfaceKitConnector::open`].
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. The gateway calls primitives from
//! whatever context delivered the request, possibly several at once.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Identity of the attached device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Factory serial number.
    pub serial_number: i32,
    /// Model name reported by the device.
    pub model_name: String,
}

impl DeviceIdentity {
    /// Create an identity record.
    pub fn new(serial_number: i32, model_name: impl Into<String>) -> Self {
        Self {
            serial_number,
            model_name: model_name.into(),
        }
    }

    /// Read identity from a device handle.
    pub fn query(kit: &dyn InterfaceKit) -> Result<Self> {
        Ok(Self {
            serial_number: kit.serial_number()?,
            model_name: kit.device_name()?,
        })
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial={})", self.model_name, self.serial_number)
    }
}

/// Channel bank on an InterfaceKit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Analog sensor input
    AnalogInput,
    /// Digital input
    DigitalInput,
    /// Digital output
    DigitalOutput,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnalogInput => write!(f, "analog input"),
            Self::DigitalInput => write!(f, "digital input"),
            Self::DigitalOutput => write!(f, "digital output"),
        }
    }
}

/// Number of channels in each bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounts {
    /// Analog input channels
    pub analog_inputs: u32,
    /// Digital input channels
    pub digital_inputs: u32,
    /// Digital output channels
    pub digital_outputs: u32,
}

impl ChannelCounts {
    /// Create a channel count record.
    pub fn new(analog_inputs: u32, digital_inputs: u32, digital_outputs: u32) -> Self {
        Self {
            analog_inputs,
            digital_inputs,
            digital_outputs,
        }
    }

    /// Read channel counts from a device handle.
    pub fn query(kit: &dyn InterfaceKit) -> Result<Self> {
        Ok(Self {
            analog_inputs: kit.sensor_count()?,
            digital_inputs: kit.input_count()?,
            digital_outputs: kit.output_count()?,
        })
    }

    /// Channel count for one bank.
    pub fn count(&self, kind: ChannelKind) -> u32 {
        match kind {
            ChannelKind::AnalogInput => self.analog_inputs,
            ChannelKind::DigitalInput => self.digital_inputs,
            ChannelKind::DigitalOutput => self.digital_outputs,
        }
    }

    /// Check whether `channel` exists in the given bank.
    pub fn contains(&self, kind: ChannelKind, channel: u32) -> bool {
        channel < self.count(kind)
    }
}

/// Physical attach/detach transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device was plugged in and is ready for I/O.
    Attached,
    /// The device was unplugged.
    Detached,
}

/// Which device to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerialFilter {
    /// First device found
    #[default]
    Any,
    /// Only the device with this serial number
    Serial(i32),
}

impl SerialFilter {
    /// Build a filter from a configured serial, where 0 means any device.
    pub fn from_serial(serial: i32) -> Self {
        if serial == 0 {
            Self::Any
        } else {
            Self::Serial(serial)
        }
    }

    /// Check whether a device with `serial` satisfies the filter.
    pub fn matches(&self, serial: i32) -> bool {
        match self {
            Self::Any => true,
            Self::Serial(wanted) => *wanted == serial,
        }
    }
}

/// Synchronous handle to an InterfaceKit.
///
/// Every method may fail independently. Channel indices are not validated by
/// callers before the call; a driver returns
/// [`DeviceErrorKind::InvalidChannel`](crate::DeviceErrorKind::InvalidChannel)
/// for indices it does not have.
pub trait InterfaceKit: Send + Sync {
    /// Number of analog sensor inputs.
    fn sensor_count(&self) -> Result<u32>;

    /// Number of digital inputs.
    fn input_count(&self) -> Result<u32>;

    /// Number of digital outputs.
    fn output_count(&self) -> Result<u32>;

    /// Factory serial number.
    fn serial_number(&self) -> Result<i32>;

    /// Model name.
    fn device_name(&self) -> Result<String>;

    /// Raw reading of an analog sensor input.
    fn sensor_value(&self, channel: u32) -> Result<i32>;

    /// State of a digital input.
    fn input_state(&self, channel: u32) -> Result<bool>;

    /// Drive a digital output.
    fn set_output_state(&self, channel: u32, state: bool) -> Result<()>;
}

/// A device opened through an [`InterfaceKitConnector`].
pub struct OpenedDevice {
    /// Shared handle for channel I/O.
    pub handle: Arc<dyn InterfaceKit>,
    /// Attach/detach transitions, one event per physical transition.
    pub events: mpsc::UnboundedReceiver<DeviceEvent>,
}

impl fmt::Debug for OpenedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedDevice").finish_non_exhaustive()
    }
}

/// Opens devices and registers for their attach/detach events.
pub trait InterfaceKitConnector: Send + Sync {
    /// Open the device matching `filter`.
    fn open(&self, filter: SerialFilter) -> Result<OpenedDevice>;
}

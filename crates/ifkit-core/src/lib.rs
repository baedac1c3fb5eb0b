//! Core types and traits for InterfaceKit-style I/O devices.
//!
//! This crate holds the contract between the channel gateway and the physical
//! device it drives. Nothing here talks to hardware; driver crates implement
//! [`InterfaceKit`] and [`InterfaceKitConnector`], the gateway consumes them.
//!
//! ## Modules
//!
//! - [`device`] - The [`InterfaceKit`] handle trait, device metadata and attach/detach events
//! - [`calibration`] - Full-scale conversion from raw sensor values to volts
//! - [`error`] - [`DeviceError`] and its [`DeviceErrorKind`] classification

pub mod calibration;
pub mod device;
pub mod error;

pub use calibration::Calibration;
pub use device::{
    ChannelCounts, ChannelKind, DeviceEvent, DeviceIdentity, InterfaceKit, InterfaceKitConnector,
    OpenedDevice, SerialFilter,
};
pub use error::{DeviceError, DeviceErrorKind, Result};

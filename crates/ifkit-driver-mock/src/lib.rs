//! Simulated InterfaceKit hardware for the gateway.
//!
//! Provides a device that behaves like a real InterfaceKit at the
//! [`InterfaceKit`](ifkit_core::InterfaceKit) boundary: channel banks, an
//! identity, attach/detach events, and per-call failures.
//!
//! - [`MockInterfaceKit`] - the simulated device, with `plug`/`unplug` control
//! - [`MockConnector`] - opens the simulated device through a serial filter
//! - [`FaultConfig`] - per-channel, counted, timeout and random fault injection
//!
//! ```rust
//! use std::sync::Arc;
//! use ifkit_core::{InterfaceKit, InterfaceKitConnector, SerialFilter};
//! use ifkit_driver_mock::{MockConnector, MockInterfaceKit};
//!
//! let kit = Arc::new(MockInterfaceKit::new());
//! let opened = MockConnector::new(kit.clone()).open(SerialFilter::Any).unwrap();
//! kit.plug();
//! assert_eq!(opened.handle.sensor_count().unwrap(), 8);
//! ```

pub mod common;
mod mock_interface_kit;

pub use common::{FaultConfig, FaultScenario, MockRng};
pub use common::errors::{OP_INPUT_STATE, OP_SENSOR_VALUE, OP_SET_OUTPUT_STATE};
pub use mock_interface_kit::{MockConnector, MockInterfaceKit, MockInterfaceKitConfig};

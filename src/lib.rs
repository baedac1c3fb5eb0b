//! # InterfaceKit Gateway
//!
//! Serves batched analog-read, digital-read and digital-write requests for a
//! single InterfaceKit I/O board whose USB attachment comes and goes at
//! runtime. Requests against a detached board degrade to empty responses
//! instead of failing, and a fault on one channel never aborts the rest of
//! its batch.
//!
//! ## Crate Structure
//!
//! - **`gateway`**: The [`Gateway`](gateway::Gateway) itself, guarding every
//!   batch on attachment state and converting raw readings to volts.
//! - **`attachment`**: Attachment tracking, latched metadata and the
//!   warn-once-per-outage gate.
//! - **`batch`**: Response types and the per-channel fault-isolation fold.
//! - **`command`**: The out-of-band `exit`/`help` control channel.
//! - **`shutdown`**: One-way cooperative shutdown latch.
//! - **`events`**: Pump that applies device attach/detach events.
//! - **`console`**: Line-oriented request surface used by the binary.
//! - **`config`**: Figment-based layered configuration.
//! - **`logging`**: `tracing-subscriber` setup.
//! - **`error`**: `GatewayError` and `ConfigError`.
//!
//! Device access goes through the [`ifkit_core::InterfaceKit`] trait; the
//! `ifkit-driver-mock` crate provides a simulated board.

pub mod attachment;
pub mod batch;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod shutdown;

pub use error::{ConfigError, GatewayError, GatewayResult};
pub use gateway::{Gateway, GatewaySettings, GatewayStatus};
pub use shutdown::ShutdownSignal;

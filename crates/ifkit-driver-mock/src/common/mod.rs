//! Shared infrastructure for the simulated device.
//!
//! - **errors**: Fault injection framework
//! - **rng**: Seeded random number generator

pub mod errors;
pub mod rng;

pub use errors::{FaultConfig, FaultScenario};
pub use rng::MockRng;

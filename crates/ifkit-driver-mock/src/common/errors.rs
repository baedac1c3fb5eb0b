//! Fault injection framework for the simulated device.
//!
//! Enables per-channel, counted and random failures so gateway fault isolation
//! can be exercised without hardware. Failures surface as [`DeviceError`]s
//! exactly like a real driver would return them.

use super::rng::MockRng;
use ifkit_core::{DeviceError, DeviceErrorKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Operation name for analog reads.
pub const OP_SENSOR_VALUE: &str = "sensor_value";
/// Operation name for digital input reads.
pub const OP_INPUT_STATE: &str = "input_state";
/// Operation name for digital output writes.
pub const OP_SET_OUTPUT_STATE: &str = "set_output_state";

/// Fault injection configuration
#[derive(Clone, Debug)]
pub struct FaultConfig {
    /// Per-operation failure rate (0.0 to 1.0), `"*"` matches every operation
    failure_rates: Arc<HashMap<&'static str, f64>>,
    /// Deterministic failure scenarios
    scenarios: Arc<Vec<FaultScenario>>,
    rng: Arc<MockRng>,
    state: Arc<Mutex<FaultState>>,
}

/// A deterministic failure scenario.
#[derive(Debug, Clone)]
pub enum FaultScenario {
    /// Every call of `operation` on `channel` fails
    FailChannel {
        /// Operation name, e.g. [`OP_SENSOR_VALUE`]
        operation: &'static str,
        /// Channel that always fails
        channel: u32,
    },
    /// Fail after N successful calls of `operation`
    FailAfterN {
        /// Operation name
        operation: &'static str,
        /// Successful calls before failures start
        count: u32,
    },
    /// Every call of `operation` times out
    Timeout {
        /// Operation name
        operation: &'static str,
    },
    /// First call of any operation loses communication, and so do all later ones
    CommunicationLoss,
}

#[derive(Default, Debug)]
struct FaultState {
    operation_counts: HashMap<&'static str, u32>,
    communication_lost: bool,
}

impl FaultConfig {
    /// No faults (default)
    pub fn none() -> Self {
        Self::build(HashMap::new(), Vec::new(), None)
    }

    /// Uniform random failures on every operation with a fixed seed.
    pub fn random_failures_seeded(rate: f64, seed: Option<u64>) -> Self {
        let mut rates = HashMap::new();
        rates.insert("*", rate);
        Self::build(rates, Vec::new(), seed)
    }

    /// A single scenario
    pub fn scenario(scenario: FaultScenario) -> Self {
        Self::scenarios(vec![scenario])
    }

    /// Several scenarios, checked in order
    pub fn scenarios(scenarios: Vec<FaultScenario>) -> Self {
        Self::build(HashMap::new(), scenarios, None)
    }

    /// Custom failure rates per operation
    pub fn with_rates(rates: HashMap<&'static str, f64>) -> Self {
        Self::build(rates, Vec::new(), None)
    }

    fn build(
        rates: HashMap<&'static str, f64>,
        scenarios: Vec<FaultScenario>,
        seed: Option<u64>,
    ) -> Self {
        Self {
            failure_rates: Arc::new(rates),
            scenarios: Arc::new(scenarios),
            rng: Arc::new(MockRng::new(seed)),
            state: Arc::new(Mutex::new(FaultState::default())),
        }
    }

    /// Check whether a call should fail, returning the injected error if so.
    pub fn check(&self, operation: &'static str, channel: u32) -> Result<(), DeviceError> {
        let mut state = self.state.lock();

        if state.communication_lost {
            return Err(DeviceError::new(
                DeviceErrorKind::Communication,
                "communication lost",
            ));
        }

        for scenario in self.scenarios.iter() {
            match scenario {
                FaultScenario::FailChannel {
                    operation: op,
                    channel: ch,
                } if *op == operation && *ch == channel => {
                    return Err(DeviceError::hardware(format!(
                        "injected fault on {operation} channel {channel}"
                    )));
                }
                FaultScenario::FailAfterN {
                    operation: op,
                    count,
                } if *op == operation => {
                    let current = state.operation_counts.entry(operation).or_insert(0);
                    *current += 1;
                    if *current > *count {
                        return Err(DeviceError::hardware(format!(
                            "injected failure after {count} operations"
                        )));
                    }
                }
                FaultScenario::Timeout { operation: op } if *op == operation => {
                    return Err(DeviceError::new(
                        DeviceErrorKind::Timeout,
                        format!("operation '{operation}' timed out"),
                    ));
                }
                FaultScenario::CommunicationLoss => {
                    state.communication_lost = true;
                    return Err(DeviceError::new(
                        DeviceErrorKind::Communication,
                        "communication lost",
                    ));
                }
                _ => {}
            }
        }

        let rate = self
            .failure_rates
            .get(operation)
            .or_else(|| self.failure_rates.get("*"))
            .copied()
            .unwrap_or(0.0);

        if self.rng.should_fail(rate) {
            return Err(DeviceError::hardware(format!(
                "random failure on operation '{operation}'"
            )));
        }

        Ok(())
    }

    /// Clear counters and lost-communication state.
    pub fn reset(&self) {
        *self.state.lock() = FaultState::default();
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::none()
    }
}

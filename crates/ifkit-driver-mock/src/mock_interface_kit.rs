//! Simulated InterfaceKit with plug/unplug and fault injection.

use std::sync::Arc;

use ifkit_core::{
    ChannelCounts, ChannelKind, DeviceError, DeviceEvent, DeviceIdentity, InterfaceKit,
    InterfaceKitConnector, OpenedDevice, SerialFilter,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::common::errors::{OP_INPUT_STATE, OP_SENSOR_VALUE, OP_SET_OUTPUT_STATE};
use crate::common::FaultConfig;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for [`MockInterfaceKit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockInterfaceKitConfig {
    /// Serial number reported by the device
    #[serde(default = "default_serial")]
    pub serial_number: i32,

    /// Model name reported by the device
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Number of analog sensor inputs
    #[serde(default = "default_channels")]
    pub analog_inputs: u32,

    /// Number of digital inputs
    #[serde(default = "default_channels")]
    pub digital_inputs: u32,

    /// Number of digital outputs
    #[serde(default = "default_channels")]
    pub digital_outputs: u32,

    /// Initial raw sensor readings; missing channels read 0
    #[serde(default)]
    pub sensor_values: Vec<i32>,

    /// Delay before the simulated device is plugged in, in milliseconds
    #[serde(default)]
    pub attach_delay_ms: u64,
}

fn default_serial() -> i32 {
    100_001
}

fn default_model_name() -> String {
    "Phidget InterfaceKit 8/8/8".to_string()
}

fn default_channels() -> u32 {
    8
}

impl Default for MockInterfaceKitConfig {
    fn default() -> Self {
        Self {
            serial_number: default_serial(),
            model_name: default_model_name(),
            analog_inputs: default_channels(),
            digital_inputs: default_channels(),
            digital_outputs: default_channels(),
            sensor_values: Vec::new(),
            attach_delay_ms: 0,
        }
    }
}

// =============================================================================
// MockInterfaceKit
// =============================================================================

#[derive(Debug)]
struct MockState {
    attached: bool,
    sensors: Vec<i32>,
    inputs: Vec<bool>,
    outputs: Vec<bool>,
    write_log: Vec<(u32, bool)>,
}

/// Simulated InterfaceKit.
///
/// Starts unplugged. [`plug`](Self::plug) and [`unplug`](Self::unplug) toggle
/// attachment and notify every subscriber once per transition. While
/// unplugged every primitive fails with `NotAttached`, like the real device.
pub struct MockInterfaceKit {
    identity: DeviceIdentity,
    counts: ChannelCounts,
    state: Mutex<MockState>,
    faults: FaultConfig,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<DeviceEvent>>>,
}

impl MockInterfaceKit {
    /// Create a simulated device with default configuration.
    pub fn new() -> Self {
        Self::with_config(MockInterfaceKitConfig::default())
    }

    /// Create a simulated device from configuration.
    pub fn with_config(config: MockInterfaceKitConfig) -> Self {
        Self::with_faults(config, FaultConfig::none())
    }

    /// Create a simulated device with fault injection.
    pub fn with_faults(config: MockInterfaceKitConfig, faults: FaultConfig) -> Self {
        let mut sensors = config.sensor_values;
        sensors.resize(config.analog_inputs as usize, 0);

        Self {
            identity: DeviceIdentity::new(config.serial_number, config.model_name),
            counts: ChannelCounts::new(
                config.analog_inputs,
                config.digital_inputs,
                config.digital_outputs,
            ),
            state: Mutex::new(MockState {
                attached: false,
                sensors,
                inputs: vec![false; config.digital_inputs as usize],
                outputs: vec![false; config.digital_outputs as usize],
                write_log: Vec::new(),
            }),
            faults,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Identity this device reports.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Register for attach/detach events.
    ///
    /// A device that is already plugged in queues an `Attached` event for the
    /// new subscriber so it does not miss the current state.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DeviceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = self.state.lock();
        if state.attached {
            let _ = tx.send(DeviceEvent::Attached);
        }
        self.subscribers.lock().push(tx);
        rx
    }

    /// Simulate plugging the device in. No-op if already attached.
    pub fn plug(&self) {
        let mut state = self.state.lock();
        if state.attached {
            return;
        }
        state.attached = true;
        info!(serial = self.identity.serial_number, "Simulated InterfaceKit plugged in");
        // Notify under the state lock so a concurrent subscribe sees exactly one Attached.
        self.notify(DeviceEvent::Attached);
    }

    /// Simulate unplugging the device. No-op if already detached.
    pub fn unplug(&self) {
        let mut state = self.state.lock();
        if !state.attached {
            return;
        }
        state.attached = false;
        info!(serial = self.identity.serial_number, "Simulated InterfaceKit unplugged");
        self.notify(DeviceEvent::Detached);
    }

    /// Whether the simulated device is plugged in.
    pub fn is_plugged(&self) -> bool {
        self.state.lock().attached
    }

    /// Set the raw reading of an analog input.
    pub fn set_sensor_value(&self, channel: u32, raw: i32) {
        if let Some(slot) = self.state.lock().sensors.get_mut(channel as usize) {
            *slot = raw;
        }
    }

    /// Set the state of a digital input.
    pub fn set_input(&self, channel: u32, value: bool) {
        if let Some(slot) = self.state.lock().inputs.get_mut(channel as usize) {
            *slot = value;
        }
    }

    /// Current state of a digital output.
    pub fn output(&self, channel: u32) -> Option<bool> {
        self.state.lock().outputs.get(channel as usize).copied()
    }

    /// Every successful output write, in call order.
    pub fn output_writes(&self) -> Vec<(u32, bool)> {
        self.state.lock().write_log.clone()
    }

    fn notify(&self, event: DeviceEvent) {
        // Drop subscribers whose receiver is gone.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event).is_ok());
    }

    fn ensure_attached(&self, state: &MockState) -> Result<(), DeviceError> {
        if state.attached {
            Ok(())
        } else {
            Err(DeviceError::not_attached())
        }
    }

    fn validate_channel(&self, kind: ChannelKind, channel: u32) -> Result<usize, DeviceError> {
        if self.counts.contains(kind, channel) {
            Ok(channel as usize)
        } else {
            Err(DeviceError::invalid_channel(
                kind,
                channel,
                self.counts.count(kind),
            ))
        }
    }
}

impl Default for MockInterfaceKit {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockInterfaceKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockInterfaceKit")
            .field("identity", &self.identity)
            .field("counts", &self.counts)
            .field("attached", &self.is_plugged())
            .finish()
    }
}

impl InterfaceKit for MockInterfaceKit {
    fn sensor_count(&self) -> ifkit_core::Result<u32> {
        self.ensure_attached(&self.state.lock())?;
        Ok(self.counts.analog_inputs)
    }

    fn input_count(&self) -> ifkit_core::Result<u32> {
        self.ensure_attached(&self.state.lock())?;
        Ok(self.counts.digital_inputs)
    }

    fn output_count(&self) -> ifkit_core::Result<u32> {
        self.ensure_attached(&self.state.lock())?;
        Ok(self.counts.digital_outputs)
    }

    fn serial_number(&self) -> ifkit_core::Result<i32> {
        self.ensure_attached(&self.state.lock())?;
        Ok(self.identity.serial_number)
    }

    fn device_name(&self) -> ifkit_core::Result<String> {
        self.ensure_attached(&self.state.lock())?;
        Ok(self.identity.model_name.clone())
    }

    fn sensor_value(&self, channel: u32) -> ifkit_core::Result<i32> {
        let state = self.state.lock();
        self.ensure_attached(&state)?;
        self.faults.check(OP_SENSOR_VALUE, channel)?;
        let idx = self.validate_channel(ChannelKind::AnalogInput, channel)?;
        Ok(state.sensors[idx])
    }

    fn input_state(&self, channel: u32) -> ifkit_core::Result<bool> {
        let state = self.state.lock();
        self.ensure_attached(&state)?;
        self.faults.check(OP_INPUT_STATE, channel)?;
        let idx = self.validate_channel(ChannelKind::DigitalInput, channel)?;
        Ok(state.inputs[idx])
    }

    fn set_output_state(&self, channel: u32, value: bool) -> ifkit_core::Result<()> {
        let mut state = self.state.lock();
        self.ensure_attached(&state)?;
        self.faults.check(OP_SET_OUTPUT_STATE, channel)?;
        let idx = self.validate_channel(ChannelKind::DigitalOutput, channel)?;
        state.outputs[idx] = value;
        state.write_log.push((channel, value));
        debug!(channel, value, "Simulated digital output set");
        Ok(())
    }
}

// =============================================================================
// MockConnector
// =============================================================================

/// Connector that "finds" a single simulated device.
#[derive(Debug, Clone)]
pub struct MockConnector {
    kit: Arc<MockInterfaceKit>,
}

impl MockConnector {
    /// Wrap a simulated device.
    pub fn new(kit: Arc<MockInterfaceKit>) -> Self {
        Self { kit }
    }

    /// The simulated device behind this connector.
    pub fn kit(&self) -> &Arc<MockInterfaceKit> {
        &self.kit
    }
}

impl InterfaceKitConnector for MockConnector {
    fn open(&self, filter: SerialFilter) -> ifkit_core::Result<OpenedDevice> {
        let serial = self.kit.identity.serial_number;
        if !filter.matches(serial) {
            return Err(match filter {
                SerialFilter::Serial(wanted) => DeviceError::not_found(wanted),
                SerialFilter::Any => DeviceError::not_found(serial),
            });
        }

        let handle: Arc<dyn InterfaceKit> = self.kit.clone();
        Ok(OpenedDevice {
            handle,
            events: self.kit.subscribe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FaultScenario;
    use ifkit_core::DeviceErrorKind;

    fn attached_kit() -> MockInterfaceKit {
        let kit = MockInterfaceKit::with_config(MockInterfaceKitConfig {
            sensor_values: vec![10, 20, 30],
            ..Default::default()
        });
        kit.plug();
        kit
    }

    #[test]
    fn test_unplugged_calls_fail() {
        let kit = MockInterfaceKit::new();
        let err = kit.sensor_value(0).unwrap_err();
        assert_eq!(err.kind, DeviceErrorKind::NotAttached);
        assert!(kit.sensor_count().is_err());
    }

    #[test]
    fn test_reads_and_padding() {
        let kit = attached_kit();
        assert_eq!(kit.sensor_value(1).unwrap(), 20);
        assert_eq!(kit.sensor_value(7).unwrap(), 0);
        assert_eq!(
            kit.sensor_value(8).unwrap_err().kind,
            DeviceErrorKind::InvalidChannel
        );
    }

    #[test]
    fn test_outputs_are_recorded() {
        let kit = attached_kit();
        kit.set_output_state(2, true).unwrap();
        kit.set_output_state(5, false).unwrap();
        assert_eq!(kit.output(2), Some(true));
        assert_eq!(kit.output_writes(), vec![(2, true), (5, false)]);
        assert!(kit.set_output_state(8, true).is_err());
        assert_eq!(kit.output_writes().len(), 2);
    }

    #[test]
    fn test_injected_channel_fault() {
        let kit = MockInterfaceKit::with_faults(
            MockInterfaceKitConfig::default(),
            FaultConfig::scenario(FaultScenario::FailChannel {
                operation: OP_INPUT_STATE,
                channel: 1,
            }),
        );
        kit.plug();
        kit.set_input(0, true);
        assert!(kit.input_state(0).unwrap());
        assert_eq!(kit.input_state(1).unwrap_err().kind, DeviceErrorKind::Hardware);
    }

    #[test]
    fn test_events_once_per_transition() {
        let kit = MockInterfaceKit::new();
        let mut rx = kit.subscribe();

        kit.plug();
        kit.plug();
        kit.unplug();
        kit.unplug();

        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Attached);
        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Detached);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_late_subscriber_sees_attached() {
        let kit = attached_kit();
        let mut rx = kit.subscribe();
        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Attached);
    }

    #[test]
    fn test_connector_serial_filter() {
        let kit = Arc::new(MockInterfaceKit::new());
        let serial = kit.identity().serial_number;
        let connector = MockConnector::new(kit);

        assert!(connector.open(SerialFilter::Any).is_ok());
        assert!(connector.open(SerialFilter::Serial(serial)).is_ok());
        let err = connector.open(SerialFilter::Serial(serial + 1)).unwrap_err();
        assert_eq!(err.kind, DeviceErrorKind::NotFound);
    }

    #[test]
    fn test_config_from_toml() {
        let config: MockInterfaceKitConfig = toml::from_str(
            r#"
            serial_number = 4242
            analog_inputs = 4
            sensor_values = [1, 2]
            "#,
        )
        .unwrap();

        assert_eq!(config.serial_number, 4242);
        assert_eq!(config.analog_inputs, 4);
        assert_eq!(config.digital_outputs, 8);
        assert_eq!(config.model_name, "Phidget InterfaceKit 8/8/8");
    }
}

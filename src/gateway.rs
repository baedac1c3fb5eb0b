//! Attachment-guarded channel I/O gateway.
//!
//! [`Gateway`] sits between batch requests and the device handle. Each batch
//! operation evaluates gateway state exactly once, at call time:
//!
//! | State | Result |
//! |-------|--------|
//! | shutdown triggered | `Err(GatewayError::ShuttingDown)` |
//! | not initialized, or not attached | degraded empty response, warning logged once per outage |
//! | initialized and attached | every channel attempted, failures isolated per channel |
//!
//! A detached device never surfaces as an error. The only batch-level
//! rejections are shutdown and a write whose channel and value lists differ
//! in length.
//!
//! # Locking
//!
//! Tracker state lives behind one `parking_lot::Mutex`. A batch copies what
//! it needs under the lock and releases it before touching the device, so an
//! attach or detach never waits on channel I/O.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ifkit_core::{DeviceEvent, InterfaceKitConnector, SerialFilter};
//! use ifkit_driver_mock::{MockConnector, MockInterfaceKit};
//! use ifkit_gateway::gateway::{Gateway, GatewaySettings};
//! use ifkit_gateway::shutdown::ShutdownSignal;
//!
//! let kit = Arc::new(MockInterfaceKit::new());
//! let opened = MockConnector::new(kit.clone()).open(SerialFilter::Any).unwrap();
//! let gateway = Gateway::new(opened.handle, GatewaySettings::default(), ShutdownSignal::new());
//! gateway.mark_initialized();
//!
//! kit.set_sensor_value(0, 500);
//! kit.plug();
//! gateway.handle_event(DeviceEvent::Attached);
//!
//! let response = gateway.read_analog(&[0]).unwrap();
//! assert_eq!(response.values, vec![2.5]);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ifkit_core::{
    Calibration, ChannelCounts, ChannelKind, DeviceEvent, DeviceIdentity, InterfaceKit,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::attachment::{AttachmentState, AttachmentTracker, BatchContext};
use crate::batch::{
    collect_isolated, BatchResponse, ChannelFault, Disposition, FaultKind, WriteReport,
};
use crate::error::{GatewayError, GatewayResult};
use crate::shutdown::ShutdownSignal;

/// Static gateway settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    /// Prefix for log lines, identifies this gateway instance
    pub namespace: String,
    /// Calibration latched on every attach
    pub calibration: Calibration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            namespace: "/interfacekit".to_string(),
            calibration: Calibration::default(),
        }
    }
}

/// Point-in-time view of the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStatus {
    /// Gateway namespace
    pub namespace: String,
    /// Whether the host finished wiring request surfaces
    pub initialized: bool,
    /// Attachment state
    pub attachment: AttachmentState,
    /// Whether shutdown was requested
    pub shutting_down: bool,
    /// Last-known identity
    pub identity: DeviceIdentity,
    /// Last-known channel counts
    pub counts: ChannelCounts,
    /// Calibration latched at the last attach
    pub calibration: Calibration,
}

/// Channel I/O gateway for one InterfaceKit.
pub struct Gateway {
    device: Arc<dyn InterfaceKit>,
    tracker: Mutex<AttachmentTracker>,
    initialized: AtomicBool,
    shutdown: ShutdownSignal,
    settings: GatewaySettings,
}

impl Gateway {
    /// Create a gateway. It starts not initialized and not attached.
    pub fn new(
        device: Arc<dyn InterfaceKit>,
        settings: GatewaySettings,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            device,
            tracker: Mutex::new(AttachmentTracker::new(settings.namespace.clone())),
            initialized: AtomicBool::new(false),
            shutdown,
            settings,
        }
    }

    /// Gateway namespace.
    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Mark the gateway ready to serve requests.
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
        debug!(namespace = %self.settings.namespace, "Gateway initialized");
    }

    /// Whether [`mark_initialized`](Self::mark_initialized) has been called.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Whether the device is currently attached.
    pub fn is_attached(&self) -> bool {
        self.tracker.lock().is_attached()
    }

    /// See [`AttachmentTracker::warn_once_if_detached`].
    pub fn warn_once_if_detached(&self) -> bool {
        self.tracker.lock().warn_once_if_detached()
    }

    // =========================================================================
    // Device events
    // =========================================================================

    /// Apply a device event.
    pub fn handle_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Attached => self.on_attach(),
            DeviceEvent::Detached => self.on_detach(),
        }
    }

    /// Query metadata from the device and mark it attached.
    ///
    /// If the metadata query fails the device stays not attached.
    pub fn on_attach(&self) {
        let device = self.device.as_ref();
        let metadata = DeviceIdentity::query(device)
            .and_then(|identity| Ok((identity, ChannelCounts::query(device)?)));

        match metadata {
            Ok((identity, counts)) => {
                self.tracker
                    .lock()
                    .on_attach(identity, counts, self.settings.calibration);
            }
            Err(e) => {
                error!(
                    namespace = %self.settings.namespace,
                    error = %e,
                    "Failed to read InterfaceKit metadata on attach"
                );
            }
        }
    }

    /// Mark the device detached.
    pub fn on_detach(&self) {
        self.tracker.lock().on_detach();
    }

    // =========================================================================
    // Batch operations
    // =========================================================================

    /// Read analog inputs as voltages.
    pub fn read_analog(&self, channels: &[u32]) -> GatewayResult<BatchResponse<f64>> {
        let Some(ctx) = self.admit("read_analog")? else {
            return Ok(BatchResponse::not_attached());
        };

        let (values, faults) = collect_isolated(channels, |_, channel| {
            check_channel(&ctx, ChannelKind::AnalogInput, channel)?;
            let raw = self.device.sensor_value(channel)?;
            Ok(ctx.calibration.raw_to_voltage(raw))
        });
        self.log_faults("read_analog", &faults);

        Ok(BatchResponse::completed(values, faults))
    }

    /// Read digital inputs.
    pub fn read_digital(&self, channels: &[u32]) -> GatewayResult<BatchResponse<bool>> {
        let Some(ctx) = self.admit("read_digital")? else {
            return Ok(BatchResponse::not_attached());
        };

        let (values, faults) = collect_isolated(channels, |_, channel| {
            check_channel(&ctx, ChannelKind::DigitalInput, channel)?;
            Ok(self.device.input_state(channel)?)
        });
        self.log_faults("read_digital", &faults);

        Ok(BatchResponse::completed(values, faults))
    }

    /// Drive digital outputs, `channels[i]` to `values[i]`.
    ///
    /// Mismatched lengths reject the whole call before any write.
    pub fn write_digital(&self, channels: &[u32], values: &[bool]) -> GatewayResult<WriteReport> {
        let Some(ctx) = self.admit("write_digital")? else {
            return Ok(WriteReport::not_attached(channels.len()));
        };

        if channels.len() != values.len() {
            warn!(
                namespace = %self.settings.namespace,
                channels = channels.len(),
                values = values.len(),
                "Digital output values must match channels one to one; nothing written"
            );
            return Err(GatewayError::LengthMismatch {
                channels: channels.len(),
                values: values.len(),
            });
        }

        let (written, faults) = collect_isolated(channels, |position, channel| {
            check_channel(&ctx, ChannelKind::DigitalOutput, channel)?;
            self.device.set_output_state(channel, values[position])?;
            Ok(true)
        });
        self.log_faults("write_digital", &faults);

        Ok(WriteReport {
            requested: channels.len(),
            written: written.into_iter().filter(|ok| *ok).count(),
            faults,
            disposition: Disposition::Completed,
        })
    }

    /// Snapshot of gateway state.
    pub fn status(&self) -> GatewayStatus {
        let tracker = self.tracker.lock();
        GatewayStatus {
            namespace: self.settings.namespace.clone(),
            initialized: self.is_initialized(),
            attachment: tracker.state(),
            shutting_down: self.shutdown.is_triggered(),
            identity: tracker.identity().clone(),
            counts: tracker.counts(),
            calibration: tracker.calibration(),
        }
    }

    /// Decide whether a batch runs. `Ok(None)` means degrade to empty.
    fn admit(&self, operation: &'static str) -> GatewayResult<Option<BatchContext>> {
        if self.shutdown.is_triggered() {
            debug!(
                namespace = %self.settings.namespace,
                operation,
                "Refusing batch during shutdown"
            );
            return Err(GatewayError::ShuttingDown);
        }

        let mut tracker = self.tracker.lock();
        let ctx = if self.is_initialized() {
            tracker.batch_context()
        } else {
            None
        };

        if ctx.is_none() && tracker.warn_once_if_detached() {
            warn!(
                namespace = %self.settings.namespace,
                operation,
                "InterfaceKit is not attached"
            );
        }
        Ok(ctx)
    }

    fn log_faults(&self, operation: &'static str, faults: &[ChannelFault]) {
        for fault in faults {
            warn!(
                namespace = %self.settings.namespace,
                operation,
                channel = fault.channel,
                position = fault.position,
                error = %fault.kind,
                "Channel fault"
            );
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("namespace", &self.settings.namespace)
            .field("initialized", &self.is_initialized())
            .field("attached", &self.is_attached())
            .finish()
    }
}

fn check_channel(ctx: &BatchContext, kind: ChannelKind, channel: u32) -> Result<(), FaultKind> {
    if ctx.counts.contains(kind, channel) {
        Ok(())
    } else {
        Err(FaultKind::OutOfRange {
            kind,
            count: ctx.counts.count(kind),
        })
    }
}

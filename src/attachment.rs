//! Attachment state tracking.
//!
//! [`AttachmentTracker`] records whether the device is physically present,
//! the metadata latched at the last attach, and the one-shot flag that keeps
//! "not attached" warnings down to one per outage. It is a plain struct; the
//! [`Gateway`](crate::gateway::Gateway) owns it behind a single mutex.

use ifkit_core::{Calibration, ChannelCounts, DeviceIdentity};
use serde::Serialize;
use tracing::{info, warn};

/// Whether the device is physically present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentState {
    /// Device present, channel I/O allowed
    Attached,
    /// Device absent (or never seen)
    #[default]
    NotAttached,
}

/// The parts of tracker state a single batch needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchContext {
    /// Channel counts latched at attach
    pub counts: ChannelCounts,
    /// Calibration latched at attach
    pub calibration: Calibration,
}

/// Attachment state plus device metadata.
#[derive(Debug)]
pub struct AttachmentTracker {
    namespace: String,
    state: AttachmentState,
    identity: DeviceIdentity,
    counts: ChannelCounts,
    calibration: Calibration,
    warned_while_detached: bool,
}

impl AttachmentTracker {
    /// New tracker: not attached, zero identity and counts.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: AttachmentState::NotAttached,
            identity: DeviceIdentity::default(),
            counts: ChannelCounts::default(),
            calibration: Calibration::default(),
            warned_while_detached: false,
        }
    }

    /// Record an attach transition.
    pub fn on_attach(
        &mut self,
        identity: DeviceIdentity,
        counts: ChannelCounts,
        calibration: Calibration,
    ) {
        self.identity = identity;
        self.counts = counts;
        self.calibration = calibration;
        self.state = AttachmentState::Attached;
        self.warned_while_detached = false;

        info!(
            namespace = %self.namespace,
            serial = self.identity.serial_number,
            model = %self.identity.model_name,
            analog_inputs = counts.analog_inputs,
            digital_inputs = counts.digital_inputs,
            digital_outputs = counts.digital_outputs,
            "InterfaceKit attached"
        );
    }

    /// Record a detach transition. Identity and counts are kept.
    pub fn on_detach(&mut self) {
        self.state = AttachmentState::NotAttached;
        self.warned_while_detached = false;

        warn!(
            namespace = %self.namespace,
            serial = self.identity.serial_number,
            model = %self.identity.model_name,
            "InterfaceKit detached"
        );
    }

    /// Whether the device is attached.
    pub fn is_attached(&self) -> bool {
        self.state == AttachmentState::Attached
    }

    /// Current attachment state.
    pub fn state(&self) -> AttachmentState {
        self.state
    }

    /// Returns true on the first call of each detached interval, false after
    /// that and always false while attached.
    pub fn warn_once_if_detached(&mut self) -> bool {
        if self.is_attached() || self.warned_while_detached {
            return false;
        }
        self.warned_while_detached = true;
        true
    }

    /// Last-known identity (stale while detached).
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Last-known channel counts.
    pub fn counts(&self) -> ChannelCounts {
        self.counts
    }

    /// Calibration latched at the last attach.
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Context for one batch, or `None` while detached.
    pub fn batch_context(&self) -> Option<BatchContext> {
        self.is_attached().then_some(BatchContext {
            counts: self.counts,
            calibration: self.calibration,
        })
    }
}

//! Batch responses and per-channel fault isolation.
//!
//! A batch covers many channels. Each channel is attempted on its own: a
//! failure is recorded as a [`ChannelFault`] and the slot keeps its default
//! value, while the remaining channels still run. [`collect_isolated`] is the
//! fold all three gateway operations share.

use ifkit_core::{ChannelKind, DeviceError};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Why a single channel failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaultKind {
    /// Channel index beyond the attached device's count.
    #[error("{kind} channel out of range (device has {count})")]
    OutOfRange {
        /// Channel bank
        kind: ChannelKind,
        /// Channels in that bank
        count: u32,
    },

    /// The device primitive failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// A failed channel inside a batch.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("channel {channel} (position {position}): {kind}")]
pub struct ChannelFault {
    /// Index into the request
    pub position: usize,
    /// Requested channel
    pub channel: u32,
    /// Failure cause
    #[serde(serialize_with = "serialize_display")]
    pub kind: FaultKind,
}

fn serialize_display<S: Serializer>(kind: &FaultKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

/// How a batch was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Every channel was attempted against the device.
    Completed,
    /// The device was not attached; nothing was attempted.
    NotAttached,
}

/// Result of a read batch.
///
/// When `disposition` is `Completed`, `values` is position-aligned with the
/// request and failed slots hold `T::default()`. When `NotAttached`, `values`
/// is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse<T> {
    /// One value per requested channel
    pub values: Vec<T>,
    /// Channels that failed
    pub faults: Vec<ChannelFault>,
    /// How the batch was handled
    pub disposition: Disposition,
}

impl<T> BatchResponse<T> {
    /// A batch that ran against the device.
    pub fn completed(values: Vec<T>, faults: Vec<ChannelFault>) -> Self {
        Self {
            values,
            faults,
            disposition: Disposition::Completed,
        }
    }

    /// The degraded empty response returned while detached.
    pub fn not_attached() -> Self {
        Self {
            values: Vec::new(),
            faults: Vec::new(),
            disposition: Disposition::NotAttached,
        }
    }

    /// Whether this is the degraded detached response.
    pub fn is_degraded(&self) -> bool {
        self.disposition == Disposition::NotAttached
    }

    /// Whether every channel succeeded.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Drop fault details and keep the values.
    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// Result of a write batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteReport {
    /// Pairs in the request
    pub requested: usize,
    /// Pairs written successfully
    pub written: usize,
    /// Pairs that failed
    pub faults: Vec<ChannelFault>,
    /// How the batch was handled
    pub disposition: Disposition,
}

impl WriteReport {
    /// The degraded report returned while detached.
    pub fn not_attached(requested: usize) -> Self {
        Self {
            requested,
            written: 0,
            faults: Vec::new(),
            disposition: Disposition::NotAttached,
        }
    }

    /// Whether this is the degraded detached report.
    pub fn is_degraded(&self) -> bool {
        self.disposition == Disposition::NotAttached
    }
}

/// Run `op` for every channel in request order, never stopping early.
///
/// `op` receives the position in the request and the channel index. A failed
/// call leaves `T::default()` in its slot and adds a [`ChannelFault`].
pub fn collect_isolated<T, F>(channels: &[u32], mut op: F) -> (Vec<T>, Vec<ChannelFault>)
where
    T: Default,
    F: FnMut(usize, u32) -> Result<T, FaultKind>,
{
    channels.iter().copied().enumerate().fold(
        (Vec::with_capacity(channels.len()), Vec::new()),
        |(mut values, mut faults), (position, channel)| {
            match op(position, channel) {
                Ok(value) => values.push(value),
                Err(kind) => {
                    values.push(T::default());
                    faults.push(ChannelFault {
                        position,
                        channel,
                        kind,
                    });
                }
            }
            (values, faults)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_default_and_continue() {
        let (values, faults) = collect_isolated(&[0, 1, 2, 3], |_, ch| {
            if ch == 1 {
                Err(FaultKind::Device(DeviceError::hardware("boom")))
            } else {
                Ok(f64::from(ch) * 10.0)
            }
        });

        assert_eq!(values, vec![0.0, 0.0, 20.0, 30.0]);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].position, 1);
        assert_eq!(faults[0].channel, 1);
    }

    #[test]
    fn test_every_channel_attempted() {
        let mut seen = Vec::new();
        let (values, faults) = collect_isolated::<bool, _>(&[5, 5, 9], |pos, ch| {
            seen.push((pos, ch));
            Err(FaultKind::OutOfRange {
                kind: ChannelKind::DigitalInput,
                count: 4,
            })
        });

        assert_eq!(seen, vec![(0, 5), (1, 5), (2, 9)]);
        assert_eq!(values, vec![false, false, false]);
        assert_eq!(faults.len(), 3);
    }

    #[test]
    fn test_empty_request() {
        let (values, faults) = collect_isolated::<f64, _>(&[], |_, _| Ok(1.0));
        assert!(values.is_empty());
        assert!(faults.is_empty());
    }

    #[test]
    fn test_fault_display() {
        let fault = ChannelFault {
            position: 2,
            channel: 12,
            kind: FaultKind::OutOfRange {
                kind: ChannelKind::AnalogInput,
                count: 8,
            },
        };
        assert_eq!(
            fault.to_string(),
            "channel 12 (position 2): analog input channel out of range (device has 8)"
        );
    }

    #[test]
    fn test_degraded_response() {
        let resp = BatchResponse::<f64>::not_attached();
        assert!(resp.is_degraded());
        assert!(resp.values.is_empty());
        assert!(WriteReport::not_attached(3).is_degraded());
    }
}

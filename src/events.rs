//! Device event pump.
//!
//! Drains attach/detach events from the driver and applies them to the
//! gateway in arrival order. Spawn it on the host runtime; it returns when the
//! driver drops its sender or shutdown is triggered.

use std::sync::Arc;

use ifkit_core::DeviceEvent;
use tokio::sync::mpsc;
use tracing::debug;

use crate::gateway::Gateway;
use crate::shutdown::ShutdownSignal;

/// Apply device events to `gateway` until the channel closes or shutdown.
pub async fn run_event_pump(
    gateway: Arc<Gateway>,
    mut events: mpsc::UnboundedReceiver<DeviceEvent>,
    shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                debug!(namespace = gateway.namespace(), "Event pump stopping for shutdown");
                break;
            }
            event = events.recv() => match event {
                Some(event) => gateway.handle_event(event),
                None => {
                    debug!(namespace = gateway.namespace(), "Device event channel closed");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewaySettings;
    use ifkit_core::{InterfaceKitConnector, SerialFilter};
    use ifkit_driver_mock::{MockConnector, MockInterfaceKit};
    use std::time::Duration;

    async fn eventually(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_pump_tracks_plug_and_unplug() {
        let kit = Arc::new(MockInterfaceKit::new());
        let opened = MockConnector::new(kit.clone()).open(SerialFilter::Any).unwrap();
        let shutdown = ShutdownSignal::new();
        let gateway = Arc::new(Gateway::new(
            opened.handle,
            GatewaySettings::default(),
            shutdown.clone(),
        ));
        let pump = tokio::spawn(run_event_pump(
            gateway.clone(),
            opened.events,
            shutdown.clone(),
        ));

        kit.plug();
        assert!(eventually(|| gateway.is_attached()).await);

        kit.unplug();
        assert!(eventually(|| !gateway.is_attached()).await);

        shutdown.trigger("test");
        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("pump should stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_pump_stops_when_sender_dropped() {
        let kit = Arc::new(MockInterfaceKit::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Arc::new(Gateway::new(
            kit.clone(),
            GatewaySettings::default(),
            ShutdownSignal::new(),
        ));
        kit.plug();
        tx.send(DeviceEvent::Attached).unwrap();
        drop(tx);

        let pump = tokio::spawn(run_event_pump(gateway.clone(), rx, ShutdownSignal::new()));
        tokio::time::timeout(Duration::from_secs(1), pump)
            .await
            .expect("pump should stop when the channel closes")
            .unwrap();
        assert!(gateway.is_attached());
    }
}

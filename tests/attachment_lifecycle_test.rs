//! End-to-end attach/detach behavior through the event pump.

use std::sync::Arc;
use std::time::Duration;

use ifkit_core::{DeviceErrorKind, InterfaceKitConnector, SerialFilter};
use ifkit_driver_mock::{FaultConfig, MockConnector, MockInterfaceKit, MockInterfaceKitConfig};
use ifkit_gateway::attachment::AttachmentState;
use ifkit_gateway::batch::Disposition;
use ifkit_gateway::events::run_event_pump;
use ifkit_gateway::{Gateway, GatewayError, GatewaySettings, ShutdownSignal};
use tokio::task::JoinHandle;
use tracing_test::traced_test;

struct Harness {
    kit: Arc<MockInterfaceKit>,
    gateway: Arc<Gateway>,
    shutdown: ShutdownSignal,
    pump: JoinHandle<()>,
}

impl Harness {
    fn start(kit: MockInterfaceKit) -> Self {
        let kit = Arc::new(kit);
        let opened = MockConnector::new(kit.clone())
            .open(SerialFilter::Any)
            .unwrap();
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
        gateway.mark_initialized();
        Self {
            kit,
            gateway,
            shutdown,
            pump,
        }
    }

    async fn wait_attached(&self, attached: bool) {
        for _ in 0..200 {
            if self.gateway.is_attached() == attached {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("gateway never reached attached={attached}");
    }

    async fn stop(self) {
        self.shutdown.trigger("test done");
        tokio::time::timeout(Duration::from_secs(1), self.pump)
            .await
            .expect("pump should stop")
            .unwrap();
    }
}

fn count_lines(lines: &[&str], needle: &str) -> usize {
    lines.iter().filter(|line| line.contains(needle)).count()
}

#[tokio::test]
#[traced_test]
async fn test_outage_warns_once_and_rearms_after_reattach() {
    let h = Harness::start(MockInterfaceKit::new());

    // Never attached: degraded, one warning for many calls.
    for _ in 0..3 {
        let resp = h.gateway.read_digital(&[0, 1, 2]).unwrap();
        assert!(resp.values.is_empty());
        assert_eq!(resp.disposition, Disposition::NotAttached);
    }

    h.kit.set_input(2, true);
    h.kit.plug();
    h.wait_attached(true).await;
    assert_eq!(
        h.gateway.read_digital(&[0, 1, 2]).unwrap().values,
        vec![false, false, true]
    );

    h.kit.unplug();
    h.wait_attached(false).await;
    assert!(h.gateway.read_analog(&[0]).unwrap().values.is_empty());
    assert!(h.gateway.read_analog(&[0]).unwrap().values.is_empty());

    logs_assert(|lines: &[&str]| {
        match count_lines(lines, "InterfaceKit is not attached") {
            2 => Ok(()),
            n => Err(format!("expected one warning per outage (2), got {n}")),
        }
    });
    assert!(logs_contain("InterfaceKit attached"));
    assert!(logs_contain("InterfaceKit detached"));

    h.stop().await;
}

#[tokio::test]
async fn test_status_keeps_last_identity_while_detached() {
    let h = Harness::start(MockInterfaceKit::with_config(MockInterfaceKitConfig {
        serial_number: 31337,
        analog_inputs: 4,
        ..Default::default()
    }));

    let status = h.gateway.status();
    assert_eq!(status.attachment, AttachmentState::NotAttached);
    assert_eq!(status.identity.serial_number, 0);

    h.kit.plug();
    h.wait_attached(true).await;
    h.kit.unplug();
    h.wait_attached(false).await;

    let status = h.gateway.status();
    assert_eq!(status.attachment, AttachmentState::NotAttached);
    assert_eq!(status.identity.serial_number, 31337);
    assert_eq!(status.counts.analog_inputs, 4);

    h.stop().await;
}

#[tokio::test]
async fn test_mismatched_write_is_rejected_while_attached() {
    let h = Harness::start(MockInterfaceKit::new());
    h.kit.plug();
    h.wait_attached(true).await;

    let err = h.gateway.write_digital(&[0, 1], &[true]).unwrap_err();
    assert!(matches!(
        err,
        GatewayError::LengthMismatch {
            channels: 2,
            values: 1
        }
    ));
    assert!(h.kit.output_writes().is_empty());

    let report = h.gateway.write_digital(&[0, 1], &[true, false]).unwrap();
    assert_eq!(report.written, 2);
    assert_eq!(h.kit.output_writes(), vec![(0, true), (1, false)]);

    h.stop().await;
}

#[tokio::test]
async fn test_random_faults_never_abort_a_batch() {
    let h = Harness::start(MockInterfaceKit::with_faults(
        MockInterfaceKitConfig {
            sensor_values: vec![1000; 8],
            ..Default::default()
        },
        FaultConfig::random_failures_seeded(0.3, Some(7)),
    ));
    h.kit.plug();
    h.wait_attached(true).await;

    let channels: Vec<u32> = (0..8).cycle().take(64).collect();
    let resp = h.gateway.read_analog(&channels).unwrap();

    assert_eq!(resp.values.len(), channels.len());
    assert_eq!(resp.disposition, Disposition::Completed);
    assert!(!resp.faults.is_empty(), "seeded 30% rate should inject faults");
    assert!(resp.faults.len() < channels.len());
    for (position, value) in resp.values.iter().enumerate() {
        if resp.faults.iter().any(|f| f.position == position) {
            assert_eq!(*value, 0.0);
        } else {
            assert_eq!(*value, 5.0);
        }
    }

    h.stop().await;
}

#[test]
fn test_serial_filter_mismatch_refuses_open() {
    let kit = Arc::new(MockInterfaceKit::with_config(MockInterfaceKitConfig {
        serial_number: 1234,
        ..Default::default()
    }));
    let connector = MockConnector::new(kit);

    let err = connector.open(SerialFilter::Serial(9999)).unwrap_err();
    assert_eq!(err.kind, DeviceErrorKind::NotFound);
    assert!(connector.open(SerialFilter::Serial(1234)).is_ok());
}

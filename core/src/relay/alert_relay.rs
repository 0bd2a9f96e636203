use crate::config::RelayConfig;
use crate::prelude::{AlertTransport, ConfigError};
use crate::relay::dedup::DedupCache;
use crate::telemetry::{LogManager, TelemetryEvent, TelemetrySink};
use crate::wire::{AlertFingerprint, AlertRecord};
use log::{debug, warn};
use std::sync::Arc;

/// What the relay did with one inbound alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Forwarded,
    Suppressed,
    /// The alert was new but the transport refused it. Its fingerprint is
    /// released, so the next copy of the event is forwarded.
    SendFailed,
}

/// Single-hop repeater: forwards each distinct hazard event once.
pub struct AlertRelay<T: AlertTransport> {
    config: RelayConfig,
    seen: DedupCache,
    transport: T,
    telemetry: Arc<dyn TelemetrySink>,
    logger: LogManager,
}

impl<T: AlertTransport> AlertRelay<T> {
    pub fn new(
        config: RelayConfig,
        transport: T,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self, ConfigError> {
        let capacity = config.seen_capacity()?;
        let logger = LogManager::new("relay");
        logger.record(&format!(
            "dest={} loop_prevention={} max_seen={}",
            config.destination, config.enable_loop_prevention, config.max_seen
        ));

        Ok(Self {
            seen: DedupCache::new(capacity, config.enable_loop_prevention),
            config,
            transport,
            telemetry,
            logger,
        })
    }

    /// Decodes and handles a raw datagram. Malformed input is dropped without
    /// touching telemetry and yields `None`.
    pub fn handle_datagram(&mut self, bytes: &[u8], now: f64) -> Option<RelayOutcome> {
        match AlertRecord::decode(bytes) {
            Ok(alert) => Some(self.handle_alert(&alert, now)),
            Err(err) => {
                debug!("relay dropping {} byte datagram: {}", bytes.len(), err);
                None
            }
        }
    }

    pub fn handle_alert(&mut self, alert: &AlertRecord, now: f64) -> RelayOutcome {
        let delay = now - alert.emission_timestamp;
        self.telemetry.record(TelemetryEvent::AlertDelay(delay));
        self.telemetry.record(TelemetryEvent::AlertReceived);

        let fingerprint = AlertFingerprint::of(alert);
        let forward = self.seen.mark_seen_if_new(&fingerprint);
        self.logger.detail(&format!(
            "rx sno={} key={} forward={}",
            alert.sequence_number,
            fingerprint,
            if forward { "yes" } else { "no" }
        ));

        if !forward {
            return RelayOutcome::Suppressed;
        }

        let outbound = alert.relayed();
        match self.transport.send_to(&outbound, self.config.destination) {
            Ok(()) => {
                self.telemetry.record(TelemetryEvent::AlertForwarded);
                RelayOutcome::Forwarded
            }
            Err(err) => {
                warn!(
                    "relay failed to forward sno={} to {}: {}",
                    alert.sequence_number, self.config.destination, err
                );
                // Nothing left the node, so a later re-broadcast must not be
                // suppressed on account of this attempt.
                self.seen.forget_newest(&fingerprint);
                RelayOutcome::SendFailed
            }
        }
    }

    /// Number of fingerprints currently held.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    pub fn seen(&self) -> &DedupCache {
        &self.seen
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::geometry::Position;
    use crate::prelude::TransportError;
    use crate::telemetry::{MetricsRecorder, MetricsSnapshot};
    use std::io;
    use std::net::SocketAddr;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<(AlertRecord, SocketAddr)>,
        fail: bool,
    }

    impl AlertTransport for RecordingTransport {
        fn send_to(
            &mut self,
            alert: &AlertRecord,
            destination: SocketAddr,
        ) -> Result<(), TransportError> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "busy").into());
            }
            self.sent.push((alert.clone(), destination));
            Ok(())
        }
    }

    fn destination() -> SocketAddr {
        "10.0.0.255:3000".parse().unwrap()
    }

    fn build_relay(
        max_seen: usize,
        loop_prevention: bool,
    ) -> (AlertRelay<RecordingTransport>, Arc<MetricsRecorder>) {
        let metrics = Arc::new(MetricsRecorder::new());
        let config = RelayConfig {
            max_seen,
            enable_loop_prevention: loop_prevention,
            destination: destination(),
        };
        let relay = AlertRelay::new(config, RecordingTransport::default(), metrics.clone()).unwrap();
        (relay, metrics)
    }

    fn alert(seq: u64, x: f64, y: f64) -> AlertRecord {
        AlertRecord::new(seq, Position::new(x, y), 10.0, 64)
    }

    #[test]
    fn new_alert_is_forwarded_verbatim() {
        let (mut relay, metrics) = build_relay(8, true);
        let inbound = alert(1, 120.3, 45.9);

        assert_eq!(relay.handle_alert(&inbound, 10.25), RelayOutcome::Forwarded);

        let sent = &relay.transport().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, inbound);
        assert_eq!(sent[0].1, destination());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 1);
        assert_eq!(snapshot.forwarded, 1);
        assert!((snapshot.delay_sum - 0.25).abs() < 1e-12);
    }

    #[test]
    fn rebroadcast_with_jitter_is_suppressed() {
        let (mut relay, metrics) = build_relay(8, true);
        relay.handle_alert(&alert(1, 120.3, 45.9), 10.1);
        let outcome = relay.handle_alert(&alert(1, 119.8, 46.2), 10.2);

        assert_eq!(outcome, RelayOutcome::Suppressed);
        assert_eq!(relay.transport().sent.len(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.forwarded, 1);
        assert_eq!(snapshot.delay_samples, 2);
    }

    #[test]
    fn malformed_datagram_has_no_side_effects() {
        let (mut relay, metrics) = build_relay(8, true);
        assert_eq!(relay.handle_datagram(b"{\"sequenceNumber\":", 1.0), None);
        assert_eq!(relay.seen_len(), 0);
        assert!(relay.transport().sent.is_empty());
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn datagram_path_decodes_and_forwards() {
        let (mut relay, _) = build_relay(8, true);
        let bytes = alert(5, 1.0, 2.0).encode().unwrap();
        assert_eq!(
            relay.handle_datagram(&bytes, 11.0),
            Some(RelayOutcome::Forwarded)
        );
        assert_eq!(
            relay.handle_datagram(&bytes, 11.5),
            Some(RelayOutcome::Suppressed)
        );
    }

    #[test]
    fn pass_through_mode_forwards_duplicates() {
        let (mut relay, metrics) = build_relay(1, false);
        for _ in 0..3 {
            assert_eq!(
                relay.handle_alert(&alert(9, 0.0, 0.0), 10.0),
                RelayOutcome::Forwarded
            );
        }
        assert_eq!(relay.seen_len(), 0);
        assert_eq!(metrics.snapshot().forwarded, 3);
    }

    #[test]
    fn eviction_lets_oldest_event_through_again() {
        let (mut relay, _) = build_relay(2, true);
        relay.handle_alert(&alert(1, 0.0, 0.0), 10.0);
        relay.handle_alert(&alert(2, 0.0, 0.0), 10.0);
        relay.handle_alert(&alert(3, 0.0, 0.0), 10.0);
        assert_eq!(relay.seen_len(), 2);
        assert_eq!(
            relay.handle_alert(&alert(1, 0.0, 0.0), 10.0),
            RelayOutcome::Forwarded
        );
    }

    #[test]
    fn send_failure_is_absorbed_and_retried_on_next_copy() {
        let (mut relay, metrics) = build_relay(4, true);
        relay.handle_alert(&alert(7, 5.0, 5.0), 10.0);
        relay.transport_mut().fail = true;
        assert_eq!(
            relay.handle_alert(&alert(1, 0.0, 0.0), 10.0),
            RelayOutcome::SendFailed
        );
        assert_eq!(metrics.snapshot().forwarded, 1);
        assert_eq!(relay.seen_len(), 1);

        relay.transport_mut().fail = false;
        assert_eq!(
            relay.handle_alert(&alert(1, 0.2, -0.3), 10.1),
            RelayOutcome::Forwarded
        );
        assert_eq!(
            relay.handle_alert(&alert(1, 0.0, 0.0), 10.2),
            RelayOutcome::Suppressed
        );
        assert_eq!(
            relay.handle_alert(&alert(7, 5.0, 5.0), 10.3),
            RelayOutcome::Suppressed
        );
        assert_eq!(metrics.snapshot().forwarded, 2);
    }

    #[test]
    fn zero_capacity_is_a_startup_error() {
        let config = RelayConfig {
            max_seen: 0,
            ..RelayConfig::new(destination())
        };
        let result = AlertRelay::new(
            config,
            RecordingTransport::default(),
            Arc::new(MetricsRecorder::new()),
        );
        assert!(matches!(result, Err(ConfigError::NonPositiveMaxSeen(0))));
    }
}

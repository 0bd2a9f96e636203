use crate::config::ReceiverConfig;
use crate::math::stats::DelayStats;
use crate::prelude::{ConfigError, Indicator, Platform, VehicleControl, VehicleMobility};
use crate::reaction::classifier::{Assessment, ReactionZone, ThreatClassifier};
use crate::telemetry::{LogManager, TelemetryEvent, TelemetrySink};
use crate::wire::AlertRecord;
use log::debug;
use std::sync::Arc;

/// Speed command that releases the vehicle back to its default behaviour.
pub const RELEASE_CONTROL_SPEED: f64 = -1.0;

/// Command issued to the vehicle for a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actuation {
    pub speed: f64,
    pub indicator: Indicator,
}

impl Actuation {
    pub fn for_zone(zone: ReactionZone, caution_speed: f64) -> Self {
        match zone {
            ReactionZone::Critical => Self {
                speed: 0.0,
                indicator: Indicator::Red,
            },
            ReactionZone::Caution => Self {
                speed: caution_speed,
                indicator: Indicator::Amber,
            },
            ReactionZone::Clear => Self {
                speed: RELEASE_CONTROL_SPEED,
                indicator: Indicator::White,
            },
        }
    }
}

/// What happened for one received alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceptionOutcome {
    pub delay: f64,
    /// `None` when the node has no mobility capability.
    pub reaction: Option<(Assessment, Actuation)>,
}

/// Vehicle-side consumer of hazard alerts.
pub struct AlertReceiver<P: Platform> {
    config: ReceiverConfig,
    classifier: ThreatClassifier,
    platform: P,
    stats: DelayStats,
    telemetry: Arc<dyn TelemetrySink>,
    logger: LogManager,
}

impl<P: Platform> AlertReceiver<P> {
    pub fn new(
        config: ReceiverConfig,
        platform: P,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let logger = LogManager::new("receiver");
        logger.record(&format!(
            "stop={} warn={} caution_speed={}",
            config.stop_distance, config.warn_distance, config.caution_speed
        ));

        Ok(Self {
            classifier: ThreatClassifier::new(config.thresholds()),
            config,
            platform,
            stats: DelayStats::new(),
            telemetry,
            logger,
        })
    }

    /// Decodes and handles a raw datagram. Malformed input is dropped silently.
    pub fn handle_datagram(&mut self, bytes: &[u8], now: f64) -> Option<ReceptionOutcome> {
        match AlertRecord::decode(bytes) {
            Ok(alert) => Some(self.handle_alert(&alert, now)),
            Err(err) => {
                debug!("receiver dropping {} byte datagram: {}", bytes.len(), err);
                None
            }
        }
    }

    pub fn handle_alert(&mut self, alert: &AlertRecord, now: f64) -> ReceptionOutcome {
        let delay = now - alert.emission_timestamp;
        self.stats.record(delay);
        self.telemetry.record(TelemetryEvent::AlertDelay(delay));
        self.telemetry.record(TelemetryEvent::AlertReceived);
        self.logger.detail(&format!(
            "rx sno={} delay={:.4}",
            alert.sequence_number, delay
        ));

        let Some(mobility) = self.platform.mobility() else {
            self.logger.detail("no mobility capability, skipping actuation");
            return ReceptionOutcome {
                delay,
                reaction: None,
            };
        };

        let assessment =
            self.classifier
                .classify(mobility.position(), mobility.heading_deg(), alert.sender_position());
        let actuation = Actuation::for_zone(assessment.zone, self.config.caution_speed);
        mobility.set_speed(actuation.speed);
        mobility.set_indicator(actuation.indicator);

        if assessment.zone == ReactionZone::Critical {
            self.telemetry.record(TelemetryEvent::EmergencyStop);
        }
        self.logger.detail(&format!(
            "zone={:?} dist={:.1} in_front={} speed={} rgba={:?}",
            assessment.zone,
            assessment.distance,
            assessment.in_front,
            actuation.speed,
            actuation.indicator.rgba()
        ));

        ReceptionOutcome {
            delay,
            reaction: Some((assessment, actuation)),
        }
    }

    pub fn received(&self) -> u64 {
        self.stats.count()
    }

    pub fn delay_stats(&self) -> &DelayStats {
        &self.stats
    }

    /// Short status line, e.g. `received: 3 pks, av. delay: 0.0125 s`.
    pub fn status(&self) -> String {
        match self.stats.average() {
            Some(average) => format!(
                "received: {} pks, av. delay: {:.4} s",
                self.stats.count(),
                average
            ),
            None => "received: 0 pks".to_string(),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::geometry::Position;
    use crate::telemetry::MetricsRecorder;

    struct TestVehicle {
        position: Position,
        heading: f64,
        commands: Vec<(f64, Indicator)>,
        pending_speed: Option<f64>,
    }

    impl TestVehicle {
        fn at(x: f64, y: f64, heading: f64) -> Self {
            Self {
                position: Position::new(x, y),
                heading,
                commands: Vec::new(),
                pending_speed: None,
            }
        }
    }

    impl VehicleControl for TestVehicle {
        fn set_speed(&mut self, speed: f64) {
            self.pending_speed = Some(speed);
        }

        fn set_indicator(&mut self, indicator: Indicator) {
            let speed = self.pending_speed.take().unwrap_or(f64::NAN);
            self.commands.push((speed, indicator));
        }
    }

    impl VehicleMobility for TestVehicle {
        fn position(&self) -> Position {
            self.position
        }

        fn heading_deg(&self) -> f64 {
            self.heading
        }
    }

    enum TestNode {
        Vehicle(TestVehicle),
        Stationary,
    }

    impl Platform for TestNode {
        fn mobility(&mut self) -> Option<&mut dyn VehicleMobility> {
            match self {
                TestNode::Vehicle(vehicle) => Some(vehicle),
                TestNode::Stationary => None,
            }
        }
    }

    fn receiver(node: TestNode) -> (AlertReceiver<TestNode>, Arc<MetricsRecorder>) {
        let metrics = Arc::new(MetricsRecorder::new());
        let receiver =
            AlertReceiver::new(ReceiverConfig::default(), node, metrics.clone()).unwrap();
        (receiver, metrics)
    }

    fn hazard_at(x: f64, y: f64) -> AlertRecord {
        AlertRecord::new(1, Position::new(x, y), 100.0, 32)
    }

    fn commands(rx: &AlertReceiver<TestNode>) -> Vec<(f64, Indicator)> {
        match rx.platform() {
            TestNode::Vehicle(vehicle) => vehicle.commands.clone(),
            TestNode::Stationary => Vec::new(),
        }
    }

    #[test]
    fn critical_hazard_stops_vehicle() {
        let (mut rx, metrics) = receiver(TestNode::Vehicle(TestVehicle::at(0.0, 0.0, 0.0)));
        let outcome = rx.handle_alert(&hazard_at(0.0, 50.0), 100.5);

        let (assessment, actuation) = outcome.reaction.unwrap();
        assert_eq!(assessment.zone, ReactionZone::Critical);
        assert_eq!(actuation.speed, 0.0);
        assert_eq!(commands(&rx), vec![(0.0, Indicator::Red)]);
        assert_eq!(metrics.snapshot().emergency_stops, 1);
        assert_eq!(outcome.delay, 0.5);
    }

    #[test]
    fn hazard_behind_slows_vehicle() {
        let (mut rx, metrics) = receiver(TestNode::Vehicle(TestVehicle::at(0.0, 0.0, 0.0)));
        rx.handle_alert(&hazard_at(0.0, -80.0), 100.0);
        assert_eq!(commands(&rx), vec![(3.0, Indicator::Amber)]);
        assert_eq!(metrics.snapshot().emergency_stops, 0);
    }

    #[test]
    fn distant_hazard_releases_control() {
        let (mut rx, _) = receiver(TestNode::Vehicle(TestVehicle::at(0.0, 0.0, 0.0)));
        let outcome = rx.handle_alert(&hazard_at(0.0, 150.0), 100.0);
        let (assessment, actuation) = outcome.reaction.unwrap();
        assert_eq!(assessment.zone, ReactionZone::Clear);
        assert_eq!(actuation.speed, RELEASE_CONTROL_SPEED);
        assert_eq!(commands(&rx), vec![(-1.0, Indicator::White)]);
    }

    #[test]
    fn stationary_node_records_delay_without_actuation() {
        let (mut rx, metrics) = receiver(TestNode::Stationary);
        let outcome = rx.handle_alert(&hazard_at(0.0, 10.0), 101.0);

        assert_eq!(outcome.reaction, None);
        assert_eq!(rx.received(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.received, 1);
        assert_eq!(snapshot.delay_samples, 1);
        assert_eq!(snapshot.emergency_stops, 0);
    }

    #[test]
    fn running_stats_accumulate_across_alerts() {
        let (mut rx, _) = receiver(TestNode::Vehicle(TestVehicle::at(0.0, 0.0, 0.0)));
        assert_eq!(rx.status(), "received: 0 pks");
        rx.handle_alert(&hazard_at(0.0, 500.0), 100.25);
        rx.handle_alert(&hazard_at(0.0, 500.0), 100.75);
        assert_eq!(rx.received(), 2);
        assert_eq!(rx.delay_stats().average(), Some(0.5));
        assert_eq!(rx.status(), "received: 2 pks, av. delay: 0.5000 s");
    }

    #[test]
    fn malformed_datagram_is_ignored() {
        let (mut rx, metrics) = receiver(TestNode::Vehicle(TestVehicle::at(0.0, 0.0, 0.0)));
        assert!(rx.handle_datagram(b"\x00\x01garbage", 100.0).is_none());
        assert_eq!(rx.received(), 0);
        assert_eq!(metrics.snapshot().received, 0);
        assert!(commands(&rx).is_empty());
    }

    #[test]
    fn invalid_thresholds_fail_construction() {
        let config = ReceiverConfig {
            stop_distance: 0.0,
            ..ReceiverConfig::default()
        };
        let result = AlertReceiver::new(config, TestNode::Stationary, Arc::new(MetricsRecorder::new()));
        assert!(result.is_err());
    }
}

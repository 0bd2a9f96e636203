use crate::generator::profile::{build_alert_stream, ScenarioConfig};
use crate::workflow::transport::CollectingTransport;
use crate::workflow::vehicle::{SimNode, SimulatedVehicle};
use alertcore::math::Position;
use alertcore::prelude::VehicleMobility;
use alertcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use alertcore::{AlertReceiver, AlertRelay, ReactionZone, RelayConfig, RelayOutcome};
use anyhow::Context;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Zone decisions taken by the receiver during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZoneCounts {
    pub critical: usize,
    pub caution: usize,
    pub clear: usize,
}

impl ZoneCounts {
    fn count(&mut self, zone: ReactionZone) {
        match zone {
            ReactionZone::Critical => self.critical += 1,
            ReactionZone::Caution => self.caution += 1,
            ReactionZone::Clear => self.clear += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub relay: MetricsSnapshot,
    pub receiver: MetricsSnapshot,
    pub suppressed: usize,
    pub seen_len: usize,
    pub zones: ZoneCounts,
    pub final_speed: Option<f64>,
    pub final_position: Option<Position>,
    pub receiver_status: String,
}

/// Plays a generated alert stream through one relay and one receiving vehicle.
#[derive(Clone)]
pub struct Runner {
    config: ScenarioConfig,
}

impl Runner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn execute(
        &self,
        relay_metrics: Arc<MetricsRecorder>,
        receiver_metrics: Arc<MetricsRecorder>,
    ) -> anyhow::Result<ScenarioResult> {
        let stream = build_alert_stream(&self.config).context("building alert stream")?;

        let relay_config = RelayConfig {
            max_seen: self.config.max_seen,
            enable_loop_prevention: self.config.enable_loop_prevention,
            destination: SocketAddr::from(([127, 0, 0, 1], 3000)),
        };
        let mut relay = AlertRelay::new(
            relay_config,
            CollectingTransport::default(),
            relay_metrics.clone(),
        )
        .context("initializing relay")?;

        let vehicle = SimulatedVehicle::new(Position::new(0.0, 0.0), self.config.vehicle_heading_deg);
        let mut receiver = AlertReceiver::new(
            self.config.receiver.clone(),
            SimNode::vehicle(vehicle),
            receiver_metrics.clone(),
        )
        .context("initializing receiver")?;

        let mut suppressed = 0;
        let mut zones = ZoneCounts::default();
        let mut clock = 0.0;

        for scheduled in &stream {
            if let Some(vehicle) = receiver.platform_mut().simulated_vehicle_mut() {
                vehicle.advance(scheduled.arrival - clock, self.config.cruise_speed);
            }
            clock = scheduled.arrival;

            let datagram = scheduled
                .alert
                .encode()
                .context("encoding scheduled alert")?;
            if relay.handle_datagram(&datagram, scheduled.arrival) == Some(RelayOutcome::Suppressed)
            {
                suppressed += 1;
            }

            let delivered_at = scheduled.arrival + self.config.hop_delay;
            for (_, relayed) in relay.transport_mut().drain() {
                if let Some(outcome) = receiver.handle_datagram(&relayed, delivered_at) {
                    if let Some((assessment, _)) = outcome.reaction {
                        zones.count(assessment.zone);
                    }
                }
            }
        }

        let vehicle = receiver.platform().simulated_vehicle();
        Ok(ScenarioResult {
            relay: relay_metrics.snapshot(),
            receiver: receiver_metrics.snapshot(),
            suppressed,
            seen_len: relay.seen_len(),
            zones,
            final_speed: vehicle.and_then(|v| v.commanded_speed()),
            final_position: vehicle.map(|v| v.position()),
            receiver_status: receiver.status(),
        })
    }
}

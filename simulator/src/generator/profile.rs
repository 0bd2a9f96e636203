use alertcore::math::{Position, Vec2};
use alertcore::{AlertRecord, ReceiverConfig};
use anyhow::{ensure, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameters of a synthetic hazard scenario.
///
/// A crashed vehicle ahead of the test vehicle emits one alert per
/// `interval`; each alert reaches the relay `rebroadcasts + 1` times with
/// slightly different position reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub alerts: usize,
    pub rebroadcasts: usize,
    /// Maximum position jitter per axis; must stay below half a unit.
    pub jitter: f64,
    pub interval: f64,
    pub hop_delay: f64,
    pub hazard_distance: f64,
    pub payload_length: u32,
    pub seed: u64,
    pub max_seen: usize,
    pub enable_loop_prevention: bool,
    pub vehicle_heading_deg: f64,
    pub cruise_speed: f64,
    pub receiver: ReceiverConfig,
    pub description: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            alerts: 20,
            rebroadcasts: 3,
            jitter: 0.3,
            interval: 1.0,
            hop_delay: 0.01,
            hazard_distance: 140.0,
            payload_length: 64,
            seed: 0,
            max_seen: 500,
            enable_loop_prevention: true,
            vehicle_heading_deg: 0.0,
            cruise_speed: 15.0,
            receiver: ReceiverConfig::default(),
            description: None,
        }
    }
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario {}", path_ref.display()))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path_ref.display()))?;
        Ok(config)
    }

    /// Position of the hazard, on whole units along the vehicle heading.
    pub fn hazard_position(&self) -> Position {
        let forward = Vec2::from_heading_deg(self.vehicle_heading_deg);
        Position::new(
            (forward.x * self.hazard_distance).round(),
            (forward.y * self.hazard_distance).round(),
        )
    }
}

/// One datagram as it arrives at the relay.
#[derive(Debug, Clone)]
pub struct ScheduledAlert {
    pub arrival: f64,
    pub alert: AlertRecord,
}

pub fn build_alert_stream(config: &ScenarioConfig) -> anyhow::Result<Vec<ScheduledAlert>> {
    ensure!(
        (0.0..0.5).contains(&config.jitter),
        "jitter {} must be in [0, 0.5)",
        config.jitter
    );
    ensure!(config.interval > 0.0, "interval must be positive");
    ensure!(config.hop_delay >= 0.0, "hop delay must not be negative");
    let copies = config
        .rebroadcasts
        .checked_add(1)
        .context("overflow computing copies per alert")?;

    let hazard = config.hazard_position();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stream = Vec::with_capacity(config.alerts.saturating_mul(copies));

    for index in 0..config.alerts {
        let emitted = index as f64 * config.interval;
        for copy in 0..copies {
            let reported = Position::new(
                hazard.x + jitter(&mut rng, config.jitter),
                hazard.y + jitter(&mut rng, config.jitter),
            );
            stream.push(ScheduledAlert {
                arrival: emitted + config.hop_delay * (copy + 1) as f64,
                alert: AlertRecord::new(
                    index as u64 + 1,
                    reported,
                    emitted,
                    config.payload_length,
                ),
            });
        }
    }

    stream.sort_by(|a, b| a.arrival.total_cmp(&b.arrival));
    Ok(stream)
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

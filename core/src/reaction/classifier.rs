use crate::math::geometry::{Position, Vec2};
use crate::prelude::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STOP_DISTANCE: f64 = 60.0;
pub const DEFAULT_WARN_DISTANCE: f64 = 100.0;

/// Urgency of a reported hazard relative to the receiving vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionZone {
    Critical,
    Caution,
    Clear,
}

/// Distance bands used by the classifier, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub stop_distance: f64,
    pub warn_distance: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stop_distance: DEFAULT_STOP_DISTANCE,
            warn_distance: DEFAULT_WARN_DISTANCE,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("stop_distance", self.stop_distance),
            ("warn_distance", self.warn_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if self.stop_distance > self.warn_distance {
            return Err(ConfigError::InvertedThresholds {
                stop: self.stop_distance,
                warn: self.warn_distance,
            });
        }
        Ok(())
    }
}

/// Result of classifying one hazard report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub zone: ReactionZone,
    pub in_front: bool,
    pub distance: f64,
}

/// Stateless mapping from receiver pose and hazard position to a zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreatClassifier {
    thresholds: Thresholds,
}

impl ThreatClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Classifies a hazard at `hazard` for a receiver at `receiver` heading
    /// `heading_deg` (0° along +y, clockwise).
    ///
    /// Critical needs the hazard both within the stop distance and strictly in
    /// front. Anything within the warn distance, including hazards behind or
    /// exactly abeam, is Caution.
    pub fn classify(&self, receiver: Position, heading_deg: f64, hazard: Position) -> Assessment {
        let distance = receiver.distance(hazard);
        let forward = Vec2::from_heading_deg(heading_deg);
        let to_hazard = hazard - receiver;
        let in_front = forward.dot(to_hazard) > 0.0;

        let zone = if distance <= self.thresholds.stop_distance && in_front {
            ReactionZone::Critical
        } else if distance <= self.thresholds.warn_distance {
            ReactionZone::Caution
        } else {
            ReactionZone::Clear
        };

        Assessment {
            zone,
            in_front,
            distance,
        }
    }
}

use crate::prelude::ConfigError;
use crate::reaction::classifier::Thresholds;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::num::NonZeroUsize;

pub const DEFAULT_MAX_SEEN: usize = 500;
pub const DEFAULT_CAUTION_SPEED: f64 = 3.0;

/// Relay settings, resolved once before the relay accepts traffic.
/// `destination` must already be a literal `ip:port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_max_seen")]
    pub max_seen: usize,
    #[serde(default = "default_loop_prevention")]
    pub enable_loop_prevention: bool,
    pub destination: SocketAddr,
}

fn default_max_seen() -> usize {
    DEFAULT_MAX_SEEN
}

fn default_loop_prevention() -> bool {
    true
}

impl RelayConfig {
    pub fn new(destination: SocketAddr) -> Self {
        Self {
            max_seen: DEFAULT_MAX_SEEN,
            enable_loop_prevention: true,
            destination,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.seen_capacity().map(|_| ())
    }

    pub fn seen_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.max_seen).ok_or(ConfigError::NonPositiveMaxSeen(self.max_seen))
    }
}

/// Receiver reaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub stop_distance: f64,
    pub warn_distance: f64,
    pub caution_speed: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            stop_distance: thresholds.stop_distance,
            warn_distance: thresholds.warn_distance,
            caution_speed: DEFAULT_CAUTION_SPEED,
        }
    }
}

impl ReceiverConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            stop_distance: self.stop_distance,
            warn_distance: self.warn_distance,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds().validate()?;
        if !self.caution_speed.is_finite() || self.caution_speed < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "caution_speed",
                value: self.caution_speed,
            });
        }
        Ok(())
    }
}

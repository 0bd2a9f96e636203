use crate::math::geometry::Position;
use crate::wire::AlertRecord;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Start-up configuration failures. These are fatal: no traffic is accepted
/// until the configuration validates.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_seen must be positive, got {0}")]
    NonPositiveMaxSeen(usize),
    #[error("invalid threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error("stop distance {stop} exceeds warn distance {warn}")]
    InvertedThresholds { stop: f64, warn: f64 },
    #[error("invalid destination address: {0}")]
    InvalidDestination(String),
    #[error("missing interface: {0}")]
    MissingInterface(String),
    #[error("missing configuration section: {0}")]
    MissingSection(&'static str),
    #[error("tos must fit in one byte, got {0}")]
    InvalidTos(u32),
}

/// Reasons an inbound datagram is not an alert record.
#[derive(thiserror::Error, Debug)]
pub enum WireError {
    #[error("alert record json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("non-finite field {0}")]
    NonFinite(&'static str),
}

/// Failures of the outbound send primitive.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("encoding failure: {0}")]
    Encode(#[from] WireError),
    #[error("socket failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound send primitive supplied by the surrounding runtime.
pub trait AlertTransport {
    fn send_to(&mut self, alert: &AlertRecord, destination: SocketAddr)
        -> Result<(), TransportError>;
}

/// Indicator colors the receiver can show on the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    Red,
    Amber,
    White,
}

impl Indicator {
    /// Display color as `[r, g, b, a]`.
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Indicator::Red => [255, 0, 0, 255],
            Indicator::Amber => [255, 165, 0, 255],
            Indicator::White => [255, 255, 255, 255],
        }
    }
}

/// Vehicle control surface.
pub trait VehicleControl {
    /// Commands a target speed. Negative values hand control back to the
    /// default driving behaviour.
    fn set_speed(&mut self, speed: f64);
    fn set_indicator(&mut self, indicator: Indicator);
}

/// Mobility plus control facade of a vehicle-capable node.
pub trait VehicleMobility: VehicleControl {
    fn position(&self) -> Position;
    /// Heading in degrees, 0 pointing along +y and increasing clockwise.
    fn heading_deg(&self) -> f64;
}

/// The node hosting a receiver. Nodes that cannot move return `None`.
pub trait Platform {
    fn mobility(&mut self) -> Option<&mut dyn VehicleMobility>;
}

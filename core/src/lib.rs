//! Decision-and-relay core for vehicular hazard-alert dissemination.
//!
//! A relay forwards each distinct hazard event once, suppressing re-broadcasts
//! through a bounded fingerprint cache. A receiver classifies the hazard against
//! its own position and heading and commands the vehicle accordingly.

pub mod config;
pub mod math;
pub mod prelude;
pub mod reaction;
pub mod relay;
pub mod telemetry;
pub mod wire;

pub use config::{ReceiverConfig, RelayConfig};
pub use prelude::{AlertTransport, Platform, VehicleControl, VehicleMobility};
pub use reaction::{AlertReceiver, ReactionZone, ThreatClassifier};
pub use relay::{AlertRelay, DedupCache, RelayOutcome};
pub use wire::{AlertFingerprint, AlertRecord};

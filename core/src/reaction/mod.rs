pub mod classifier;
pub mod receiver;

pub use classifier::{Assessment, ReactionZone, ThreatClassifier, Thresholds};
pub use receiver::{Actuation, AlertReceiver, ReceptionOutcome, RELEASE_CONTROL_SPEED};

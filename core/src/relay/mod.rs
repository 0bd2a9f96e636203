pub mod alert_relay;
pub mod dedup;

pub use alert_relay::{AlertRelay, RelayOutcome};
pub use dedup::DedupCache;

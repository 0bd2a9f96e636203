pub mod log;
pub mod metrics;

pub use log::LogManager;
pub use metrics::{MetricsRecorder, MetricsSnapshot};

/// Named numeric events emitted by relays and receivers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    AlertReceived,
    AlertForwarded,
    /// End-to-end delay in seconds, measured from the original emission.
    AlertDelay(f64),
    EmergencyStop,
}

/// Write-only collector. Recording never fails and never blocks on a reply.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

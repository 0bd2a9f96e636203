use alertcore::telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Telemetry of one node as served over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TelemetryModel {
    pub node: String,
    pub metrics: MetricsSnapshot,
    pub average_delay: Option<f64>,
}

impl TelemetryModel {
    pub fn new(node: &str, metrics: MetricsSnapshot) -> Self {
        Self {
            node: node.to_string(),
            average_delay: metrics.average_delay(),
            metrics,
        }
    }
}

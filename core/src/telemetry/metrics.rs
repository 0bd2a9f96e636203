use crate::telemetry::{TelemetryEvent, TelemetrySink};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub forwarded: u64,
    pub emergency_stops: u64,
    pub delay_samples: u64,
    pub delay_sum: f64,
}

impl MetricsSnapshot {
    pub fn average_delay(&self) -> Option<f64> {
        if self.delay_samples == 0 {
            None
        } else {
            Some(self.delay_sum / self.delay_samples as f64)
        }
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            metrics.clone()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl TelemetrySink for MetricsRecorder {
    fn record(&self, event: TelemetryEvent) {
        if let Ok(mut metrics) = self.inner.lock() {
            match event {
                TelemetryEvent::AlertReceived => metrics.received += 1,
                TelemetryEvent::AlertForwarded => metrics.forwarded += 1,
                TelemetryEvent::EmergencyStop => metrics.emergency_stops += 1,
                TelemetryEvent::AlertDelay(delay) => {
                    metrics.delay_samples += 1;
                    metrics.delay_sum += delay;
                }
            }
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Running delay statistics: sample count and cumulative delay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DelayStats {
    count: u64,
    sum: f64,
}

impl DelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, delay: f64) {
        self.count += 1;
        self.sum += delay;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.sum
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_average() {
        let stats = DelayStats::new();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.average(), None);
    }

    #[test]
    fn average_tracks_samples() {
        let mut stats = DelayStats::new();
        stats.record(0.5);
        stats.record(1.5);
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.total(), 2.0);
        assert_eq!(stats.average(), Some(1.0));
    }
}

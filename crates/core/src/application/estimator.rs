// WaitTimeEstimator - linear model: waiting count x average service time
//
// Ignores parallel service by several recruiters at one booth.

use crate::application::constants::DEFAULT_SERVICE_MINUTES;
use crate::domain::{Queue, QueueStats};

#[derive(Debug, Clone, Copy)]
pub struct WaitTimeEstimator {
    default_service_minutes: f64,
}

impl Default for WaitTimeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_MINUTES)
    }
}

impl WaitTimeEstimator {
    pub fn new(default_service_minutes: f64) -> Self {
        Self {
            default_service_minutes,
        }
    }

    /// Average service time, falling back to the default until a sample exists
    pub fn service_minutes(&self, stats: &QueueStats) -> f64 {
        if stats.service_samples == 0 {
            self.default_service_minutes
        } else {
            stats.average_service_time
        }
    }

    /// Minutes a newcomer would wait behind the current line
    pub fn estimate(&self, queue: &Queue) -> u32 {
        let waiting = queue.waiting_count();
        if waiting == 0 {
            return 0;
        }
        (waiting as f64 * self.service_minutes(&queue.stats))
            .round()
            .max(0.0) as u32
    }
}

// Aggregate queue statistics (maintained incrementally)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_tokens_issued: u64,
    pub total_served: u64,
    pub total_left: u64,
    pub total_expired: u64,

    /// Minutes, running mean of join -> serve waits
    pub average_wait_time: f64,
    /// Minutes, running mean of serve -> complete durations
    pub average_service_time: f64,

    pub wait_samples: u64,
    pub service_samples: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_document_requires_every_counter() {
        let stats = QueueStats {
            total_tokens_issued: 3,
            total_expired: 1,
            wait_samples: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_expired"], 1);
        assert_eq!(json["wait_samples"], 2);

        let partial = r#"{"total_tokens_issued":3,"total_served":0,"total_left":0,
            "average_wait_time":0.0,"average_service_time":0.0}"#;
        assert!(serde_json::from_str::<QueueStats>(partial).is_err());
    }
}

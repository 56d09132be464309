// Engine constants (no magic values)
use std::time::Duration;

/// Average service time assumed until the first completed interview (minutes)
pub const DEFAULT_SERVICE_MINUTES: f64 = 15.0;

/// Attempts per operation before a write conflict surfaces as Contention
pub const DEFAULT_MAX_CONTENTION_RETRIES: u32 = 8;

/// Base backoff between conflicting attempts (doubles per attempt, plus jitter)
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 5;

/// Upper bound for a single backoff sleep
pub const MAX_RETRY_DELAY_MS: u64 = 250;

/// How often the sweeper visits every queue
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

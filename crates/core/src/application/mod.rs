// Application Layer - Use Cases and Business Logic

pub mod capacity;
pub mod constants;
pub mod directory;
pub mod engine;
pub mod estimator;
pub mod shutdown;
pub mod stats;
pub mod sweeper;
pub mod token;

// Re-exports
pub use directory::{QueueDirectory, RetryConfig, SweepReport};
pub use engine::QueueEngine;
pub use estimator::WaitTimeEstimator;
pub use shutdown::{shutdown_pair, ShutdownSignal, ShutdownTrigger};
pub use sweeper::{ExpirySweeper, SweepSummary};

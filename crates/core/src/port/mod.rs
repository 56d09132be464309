// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod notifier;
pub mod queue_repository;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use notifier::QueueNotifier;
pub use queue_repository::QueueRepository;
pub use time_provider::TimeProvider;

//! JSON-RPC API Layer
//!
//! Exposes the booth queue operations as JSON-RPC 2.0 methods and pushes
//! queue-updated events to subscribers.

pub mod error;
pub mod handler;
pub mod notifier;
pub mod server;
pub mod types;

pub use notifier::BroadcastNotifier;
pub use server::{RpcServer, RpcServerConfig};

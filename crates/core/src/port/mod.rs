// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod publisher;
pub mod queue_repository;
pub mod secret_verifier;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use id_provider::IdProvider;
pub use publisher::{BroadcastPublisher, NoopPublisher, QueueEvent, QueuePublisher};
pub use queue_repository::{AdvanceOutcome, ClaimOutcome, QueueRepository};
pub use secret_verifier::SecretVerifier;
pub use time_provider::TimeProvider;
pub use transaction::{QueueTransaction, Transaction, TransactionalQueueRepository};

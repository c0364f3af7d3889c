// Application Layer - Use cases and background processes

pub mod queue_service;
pub mod reset;
pub mod shutdown;
pub mod sweeper;

// Re-exports
pub use queue_service::QueueService;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use sweeper::DailyResetScheduler;

// Domain Layer - Pure business logic and entities

pub mod error;
pub mod shop;
pub mod token;

// Re-exports
pub use error::DomainError;
pub use shop::{QueueSnapshot, ShopId, ShopQueue};
pub use token::{TokenEntry, TokenId, TokenStatus};

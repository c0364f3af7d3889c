// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown token status: {0}")]
    UnknownTokenStatus(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

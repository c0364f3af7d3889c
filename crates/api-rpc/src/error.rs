//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use waitless_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const UNAUTHORIZED: i32 = 4004;
    pub const UNAVAILABLE: i32 = 4005;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::Conflict(msg) => ErrorObjectOwned::owned(code::CONFLICT, msg, None::<()>),
        AppError::Unauthorized(msg) => {
            ErrorObjectOwned::owned(code::UNAUTHORIZED, msg, None::<()>)
        }
        AppError::Unavailable(msg) => ErrorObjectOwned::owned(code::UNAVAILABLE, msg, None::<()>),
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Io(e) => ErrorObjectOwned::owned(code::SYSTEM_ERROR, e.to_string(), None::<()>),
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

/// The THROTTLED error returned by rate-limited methods
pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_4000_range() {
        let err = to_rpc_error(AppError::NotFound("Shop x not found".into()));
        assert_eq!(err.code(), code::NOT_FOUND);

        let err = to_rpc_error(AppError::Conflict("Token already claimed".into()));
        assert_eq!(err.code(), code::CONFLICT);

        let err = to_rpc_error(AppError::Unauthorized("Invalid reset password".into()));
        assert_eq!(err.code(), code::UNAUTHORIZED);

        let err = to_rpc_error(AppError::Unavailable("paused".into()));
        assert_eq!(err.code(), code::UNAVAILABLE);
    }

    #[test]
    fn server_errors_map_to_5000_range() {
        let err = to_rpc_error(AppError::Database("locked".into()));
        assert_eq!(err.code(), code::DB_ERROR);

        let err = to_rpc_error(AppError::Internal("boom".into()));
        assert_eq!(err.code(), code::INTERNAL_ERROR);
    }
}

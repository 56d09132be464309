//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use boothline_core::error::{AppError, ErrorKind};
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const CONTENTION: i32 = 4009;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match (&err, err.kind()) {
        (AppError::Database(_), _) => code::DB_ERROR,
        (_, ErrorKind::Validation) => code::VALIDATION_ERROR,
        (_, ErrorKind::NotFound) => code::NOT_FOUND,
        (_, ErrorKind::Conflict) => code::CONFLICT,
        (_, ErrorKind::Contention) => code::CONTENTION,
        (_, ErrorKind::Internal) => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

//! # Error Types
//!
//! General error handling for snapshot construction.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Only a few conditions are errors at all. Addresses that fall outside the
//! captured memory, header words that match no known type, and duplicate
//! discoveries are ordinary outcomes and are encoded in the returned data
//! (`Option` fields, sentinel values) instead.

use thiserror::Error;

/// Main error type for snapshot operations
///
/// ## Error Categories
///
/// 1. **Configuration errors**: UnsupportedPointerSize (the snapshot cannot be interpreted)
/// 2. **Caller errors**: InvalidArgument
/// 3. **Loading errors**: Io, Json (reading a snapshot description from disk)
#[derive(Error, Debug)]
pub enum SnapshotError
{
    /// The virtual machine descriptor reports a pointer size other than 4 or 8
    ///
    /// Every pointer read in the model depends on this value, so construction
    /// of the whole snapshot is aborted.
    #[error("Unsupported pointer size: {0} bytes (expected 4 or 8)")]
    UnsupportedPointerSize(u32),

    /// Invalid argument passed to a snapshot function
    ///
    /// Examples:
    /// - An address string that is neither `0x`-prefixed hex nor decimal
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error while reading a snapshot description
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot description is not valid JSON or does not match the expected shape
    #[error("Malformed snapshot description: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, SnapshotError>`
///
/// ```rust
/// use memsnap_core::error::SnapshotResult;
/// fn foo() -> SnapshotResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

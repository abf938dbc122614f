// Error types for the strike trainer
//
// Structured errors with numeric codes suitable for handing across a
// transport boundary. Per-frame pose problems are not errors; see the
// classifier's `Classification` outcomes.

mod session;

pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the transport boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

// Session error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Session error code constants
///
/// Single source of truth for the numeric codes handed to transport and
/// persistence collaborators.
///
/// Error code range: 3001-3004
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// No live or finished session with the given id
    pub const NOT_FOUND: i32 = 3001;

    /// Mutation attempted after the session was ended
    pub const ALREADY_ENDED: i32 = 3002;

    /// Session registry or session Mutex was poisoned
    pub const LOCK_POISONED: i32 = 3003;

    /// Strike recorded inside the cooldown window of the previous one
    pub const STRIKE_IN_COOLDOWN: i32 = 3004;
}

/// Log a session error with structured context
///
/// Logs error_code, component, message and the caller-supplied context.
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session lifecycle errors
///
/// Identifier-resolution failures are the only errors that propagate out of
/// the pipeline; per-frame problems degrade to "no strike" instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Unknown session id
    NotFound { session_id: String },

    /// Session was ended and is now immutable
    AlreadyEnded { session_id: String },

    /// A lock guarding session state was poisoned
    LockPoisoned { component: String },

    /// Strike arrived less than the cooldown after the previous strike
    StrikeInCooldown {
        session_id: String,
        remaining_ms: u64,
    },
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::NotFound { .. } => SessionErrorCodes::NOT_FOUND,
            SessionError::AlreadyEnded { .. } => SessionErrorCodes::ALREADY_ENDED,
            SessionError::LockPoisoned { .. } => SessionErrorCodes::LOCK_POISONED,
            SessionError::StrikeInCooldown { .. } => SessionErrorCodes::STRIKE_IN_COOLDOWN,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::NotFound { session_id } => {
                format!("Session not found: {}", session_id)
            }
            SessionError::AlreadyEnded { session_id } => {
                format!("Session already ended: {}", session_id)
            }
            SessionError::LockPoisoned { component } => {
                format!("Lock poisoned: {}", component)
            }
            SessionError::StrikeInCooldown {
                session_id,
                remaining_ms,
            } => format!(
                "Strike rejected for {}: {} ms of cooldown remaining",
                session_id, remaining_ms
            ),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

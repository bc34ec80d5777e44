//! Session error types

use crate::permission::PermissionLevel;
use simlink_core::SessionId;
use thiserror::Error;

/// Errors raised by session management and authorization checks
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session id 0 or otherwise unusable
    #[error("Session is invalid")]
    InvalidSession,

    /// No session with this id on this node
    #[error("Session {0} does not exist")]
    SessionNotFound(SessionId),

    /// The auth id is not in the user directory
    #[error("User does not exist: {0}")]
    UnknownUser(String),

    /// Session is already bound to another identity
    #[error("Session {session_id} already logged in as {auth_id}")]
    AlreadyBound {
        /// Session identifier
        session_id: SessionId,
        /// Identity currently bound
        auth_id: String,
    },

    /// The caller has not logged in
    #[error("Please login")]
    NotLoggedIn,

    /// The caller's permission is below what the operation needs
    #[error("Permission denied: requires {required:?}, caller has {actual:?}")]
    PermissionDenied {
        /// Level the operation requires
        required: PermissionLevel,
        /// Level bound to the calling session
        actual: PermissionLevel,
    },

    /// User directory file could not be read or parsed
    #[error("User directory error: {0}")]
    Directory(String),

    /// Transport failure on the session channel
    #[error("Session transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Session message could not be encoded or decoded
    #[error("Session message error: {0}")]
    Message(#[from] serde_json::Error),
}

//! Registry and remote-call error types

use serde::{Deserialize, Serialize};
use simlink_session::SessionError;
use thiserror::Error;

/// Local registry errors (naming, export validation)
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Endpoint string does not have the `//host:port/RemoteName` shape
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Offending endpoint text
        endpoint: String,
        /// What is wrong with it
        reason: String,
    },

    /// Export name is empty or contains a path separator
    #[error("Invalid export name '{0}'")]
    InvalidName(String),

    /// Two objects were exported under one name
    #[error("Duplicate export name '{0}'")]
    DuplicateName(String),

    /// An object refused to be exported
    #[error("Export of '{name}' failed: {reason}")]
    ExportRefused {
        /// Export name
        name: String,
        /// Reason given by the object
        reason: String,
    },

    /// Socket failure while binding or listening
    #[error("Registry I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Category of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// No object is exported under the requested name
    NotFound,
    /// The object has no such method
    UnknownMethod,
    /// Arguments could not be decoded
    InvalidArgs,
    /// The caller has not logged in
    NotLoggedIn,
    /// The caller's permission level is too low
    PermissionDenied,
    /// The operation was refused by domain rules
    Rejected,
    /// The operation is recognised but not provided by this node
    Unsupported,
    /// The remote side failed while executing the call
    Internal,
    /// Connection, encoding or framing failure
    Transport,
    /// No response within the call timeout
    Timeout,
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::UnknownMethod => "unknown method",
            RemoteErrorKind::InvalidArgs => "invalid arguments",
            RemoteErrorKind::NotLoggedIn => "not logged in",
            RemoteErrorKind::PermissionDenied => "permission denied",
            RemoteErrorKind::Rejected => "rejected",
            RemoteErrorKind::Unsupported => "unsupported",
            RemoteErrorKind::Internal => "internal error",
            RemoteErrorKind::Transport => "transport error",
            RemoteErrorKind::Timeout => "timeout",
        };
        f.write_str(text)
    }
}

/// Error carried back to the caller of a remote operation
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    /// Failure category
    pub kind: RemoteErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl RemoteError {
    /// Build an error of the given kind
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Unknown export name
    pub fn not_found(name: &str) -> Self {
        Self::new(RemoteErrorKind::NotFound, format!("no object exported as '{}'", name))
    }

    /// Unknown method on an existing object
    pub fn unknown_method(method: &str) -> Self {
        Self::new(RemoteErrorKind::UnknownMethod, format!("unknown method '{}'", method))
    }

    /// Undecodable arguments
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidArgs, message)
    }

    /// Domain refusal
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, message)
    }

    /// Operation not provided by this node
    pub fn unsupported(operation: &str) -> Self {
        Self::new(
            RemoteErrorKind::Unsupported,
            format!("operation '{}' is not supported by this node", operation),
        )
    }

    /// Remote-side failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Internal, message)
    }

    /// Connection or framing failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, message)
    }

    /// Call timed out
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, message)
    }

    /// True for failures of the call machinery rather than the operation
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::Transport | RemoteErrorKind::Timeout
        )
    }
}

impl From<SessionError> for RemoteError {
    fn from(err: SessionError) -> Self {
        let kind = match &err {
            SessionError::NotLoggedIn => RemoteErrorKind::NotLoggedIn,
            SessionError::PermissionDenied { .. } => RemoteErrorKind::PermissionDenied,
            SessionError::Io(_) | SessionError::Message(_) => RemoteErrorKind::Internal,
            SessionError::Directory(_) => RemoteErrorKind::Internal,
            SessionError::InvalidSession
            | SessionError::SessionNotFound(_)
            | SessionError::UnknownUser(_)
            | SessionError::AlreadyBound { .. } => RemoteErrorKind::Rejected,
        };
        RemoteError::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_session::PermissionLevel;

    #[test]
    fn session_errors_map_to_kinds() {
        let err: RemoteError = SessionError::NotLoggedIn.into();
        assert_eq!(err.kind, RemoteErrorKind::NotLoggedIn);

        let err: RemoteError = SessionError::PermissionDenied {
            required: PermissionLevel::Administrator,
            actual: PermissionLevel::NormalUser,
        }
        .into();
        assert_eq!(err.kind, RemoteErrorKind::PermissionDenied);

        let err: RemoteError = SessionError::UnknownUser("bob".into()).into();
        assert_eq!(err.kind, RemoteErrorKind::Rejected);
        assert!(err.message.contains("bob"));
    }

    #[test]
    fn remote_error_serializes_kind_in_snake_case() {
        let json = serde_json::to_value(RemoteError::unsupported("weather")).unwrap();
        assert_eq!(json["kind"], "unsupported");
    }
}

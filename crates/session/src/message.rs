//! Messages pushed from a node to a client over the session channel.

use serde::{Deserialize, Serialize};
use simlink_core::SessionId;

/// One line on the session channel.
///
/// Each variant serializes as a single-key JSON object, e.g.
/// `{"sessionId": 3}` or `{"msg_detect_client_alive": 1712345678901}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMessage {
    /// Id assigned when the handshake connection is accepted
    #[serde(rename = "sessionId")]
    Assigned(SessionId),

    /// Identity bound to the session; `"null"` after logout
    #[serde(rename = "auth_id")]
    AuthId(String),

    /// Keep-alive probe carrying the node clock in milliseconds
    #[serde(rename = "msg_detect_client_alive")]
    KeepAlive(u64),

    /// The node is busy with another request from this session
    #[serde(rename = "socketBusy")]
    Busy(bool),
}

/// Marker auth id sent on logout.
pub const LOGGED_OUT_AUTH_ID: &str = "null";

impl SessionMessage {
    pub fn logged_out() -> Self {
        SessionMessage::AuthId(LOGGED_OUT_AUTH_ID.to_string())
    }
}

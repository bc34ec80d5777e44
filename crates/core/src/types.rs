//! Core types

/// Identifier of a transport session, unique for the lifetime of a node.
pub type SessionId = u64;

/// Sentinel used by clients that have not (or never will) receive a session
/// id, e.g. every caller in standalone mode.
pub const NO_SESSION: SessionId = 0;

//! Transport sessions and authorization for Simlink nodes.
//!
//! Every client connection accepted by a node becomes a [`Session`]: an id,
//! a transport handle and, once the client logs in, an identity and a
//! [`PermissionLevel`]. Sessions are plain data; each server operation checks
//! the permission it needs through [`CallerIdentity::require`].
//!
//! # Components
//!
//! - [`SessionManager`]: the node-owned session pool (create / bind / close,
//!   login / logout, keep-alive sweeping)
//! - [`UserDirectory`]: users and their permission tier, parsed from `user.conf`
//! - [`SessionListener`]: the out-of-band handshake listener that assigns ids
//! - [`ClientSession`]: the client-side view fed by the handshake channel

pub mod client;
pub mod error;
pub mod listener;
pub mod message;
pub mod permission;
pub mod session;
pub mod transport;
pub mod users;

pub use client::{ClientSession, SessionChannel};
pub use error::SessionError;
pub use listener::SessionListener;
pub use message::SessionMessage;
pub use permission::PermissionLevel;
pub use session::{CallerIdentity, Session, SessionManager};
pub use transport::{SessionTransport, TcpSessionTransport};
pub use users::{User, UserDirectory, LOCALHOST_ADMIN};

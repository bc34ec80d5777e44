//! Named remote capability objects for Simlink nodes.
//!
//! A server node exports a fixed set of capability objects under names of
//! the form `//{host}:{port}/Remote{Name}`. Bootstrap is all-or-nothing: the
//! address is discovered, the listener bound and every object staged before
//! anything becomes reachable.
//!
//! Calls travel as newline-delimited JSON over TCP, one request and one
//! response per connection.

#![warn(missing_docs)]

pub mod bootstrap;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod object;
pub mod wire;

pub use bootstrap::{
    bootstrap, discover_advertised_address, BootstrapConfig, BootstrapError, BootstrapStage,
    Registry, RegistryHandle,
};
pub use client::RemoteHandle;
pub use endpoint::{EndpointName, CORE_NAME};
pub use error::{RegistryError, RemoteError, RemoteErrorKind};
pub use object::{CallContext, CoreBinding, ListenerLoop, RemoteObject};
pub use wire::{decode_args, encode_result, RpcRequest, RpcResponse};

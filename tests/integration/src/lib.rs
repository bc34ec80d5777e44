//! End-to-end tests for Simlink nodes and clients
//!
//! This test suite validates:
//! - Session handshake, login and permission checks over loopback
//! - Write-through synchronization of ground vehicle mirrors
//! - Standalone shutdown through the late-bound client module

pub mod test_utils;

#[cfg(test)]
mod network_session_tests;

#[cfg(test)]
mod entity_sync_tests;

#[cfg(test)]
mod standalone_tests;

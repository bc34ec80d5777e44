//! Server node startup errors

use simlink_core::banner::StartupStage;
use simlink_registry::BootstrapError;
use simlink_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// User directory could not be loaded
    #[error("user directory: {0}")]
    Users(#[from] SessionError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

impl ServerError {
    /// Startup stage reported in the failure banner
    pub fn stage(&self) -> StartupStage {
        StartupStage::Bootstrap
    }
}

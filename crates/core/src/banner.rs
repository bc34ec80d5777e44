//! Human-readable startup and failure banners.

use crate::config::DeploymentMode;

pub const SERVER_NAME: &str = "Simlink Airspace Simulation Server";
pub const STANDALONE_NAME: &str = "Simlink Airspace Simulation Standalone";
pub const CLIENT_NAME: &str = "Simlink Airspace Simulation Client";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Startup stage that failed, used to label failure banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    Bootstrap,
    Launch,
    Readiness,
}

impl std::fmt::Display for StartupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupStage::Bootstrap => write!(f, "bootstrap"),
            StartupStage::Launch => write!(f, "launch"),
            StartupStage::Readiness => write!(f, "readiness"),
        }
    }
}

fn product_name(mode: DeploymentMode) -> &'static str {
    match mode {
        DeploymentMode::Server => SERVER_NAME,
        DeploymentMode::Standalone => STANDALONE_NAME,
    }
}

/// Short version text printed by `-version`.
pub fn version_text(mode: DeploymentMode) -> String {
    format!(
        "{}\nVersion: {} ({})",
        product_name(mode),
        VERSION,
        std::env::consts::OS
    )
}

/// Framed banner printed when a node starts.
pub fn startup_banner(mode: DeploymentMode) -> String {
    let body = format!("  {}\n  Version: {}", product_name(mode), VERSION);
    let width = body.lines().map(str::len).max().unwrap_or(0) + 2;
    let rule = "=".repeat(width);
    format!("{rule}\n{body}\n{rule}")
}

/// One-line banner naming the stage that failed.
pub fn failure_banner(mode: DeploymentMode, stage: StartupStage, reason: &str) -> String {
    format!("{}: {} failed: {}", product_name(mode), stage, reason)
}

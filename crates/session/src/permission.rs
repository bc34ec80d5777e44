//! Permission tiers bound to a session at login.

use serde::{Deserialize, Serialize};

/// Ordered permission level. `Unset` (-1) until a session authenticates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PermissionLevel {
    #[default]
    Unset,
    NormalUser,
    SimulationAdmin,
    Administrator,
}

impl PermissionLevel {
    /// Integer form carried on the wire and in diagnostics.
    pub fn as_i32(self) -> i32 {
        match self {
            PermissionLevel::Unset => -1,
            PermissionLevel::NormalUser => 0,
            PermissionLevel::SimulationAdmin => 1,
            PermissionLevel::Administrator => 2,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(PermissionLevel::Unset),
            0 => Some(PermissionLevel::NormalUser),
            1 => Some(PermissionLevel::SimulationAdmin),
            2 => Some(PermissionLevel::Administrator),
            _ => None,
        }
    }

    /// Section header used in the user directory file.
    pub(crate) fn from_section(header: &str) -> Option<Self> {
        match header {
            "Administrator" => Some(PermissionLevel::Administrator),
            "Simulation_Admin" => Some(PermissionLevel::SimulationAdmin),
            "Normal_User" => Some(PermissionLevel::NormalUser),
            _ => None,
        }
    }

    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}

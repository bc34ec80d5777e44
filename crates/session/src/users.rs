//! User directory parsed from `user.conf`.
//!
//! ```text
//! # comment
//! [Administrator]
//! admin
//! [Simulation_Admin]
//! sim1
//! [Normal_User]
//! user1:{AC_1,AC_2},{GV_1,GV_2}
//! user2
//! ```
//!
//! The equipment list after `:` is optional; the first brace group holds
//! pre-assigned aircraft ids, the second pre-assigned ground-vehicle ids.

use crate::error::SessionError;
use crate::permission::PermissionLevel;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Built-in identity for connections that originate on the node's own host.
pub const LOCALHOST_ADMIN: &str = "localhost_admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub auth_id: String,
    pub permission: PermissionLevel,
    pub assigned_aircraft: Vec<String>,
    pub assigned_ground_vehicles: Vec<String>,
}

impl User {
    fn new(auth_id: impl Into<String>, permission: PermissionLevel) -> Self {
        Self {
            auth_id: auth_id.into(),
            permission,
            assigned_aircraft: Vec::new(),
            assigned_ground_vehicles: Vec::new(),
        }
    }
}

/// Known users keyed by auth id. Always contains [`LOCALHOST_ADMIN`].
#[derive(Debug, Clone)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        let mut users = HashMap::new();
        users.insert(
            LOCALHOST_ADMIN.to_string(),
            User::new(LOCALHOST_ADMIN, PermissionLevel::Administrator),
        );
        Self { users }
    }
}

impl UserDirectory {
    /// Read and parse a directory file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Directory(format!("unable to read {}: {}", path.display(), e))
        })?;
        let directory = Self::parse(&content);
        debug!(path = %path.display(), users = directory.len(), "Loaded user directory");
        Ok(directory)
    }

    /// Parse directory text. Malformed equipment lists are logged and
    /// treated as empty; the user entry itself is kept.
    pub fn parse(content: &str) -> Self {
        let mut directory = Self::default();
        let mut section = PermissionLevel::Unset;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') || line.ends_with(']') {
                let header = line.trim_start_matches('[').trim_end_matches(']').trim();
                match PermissionLevel::from_section(header) {
                    Some(level) => section = level,
                    None => warn!(section = header, "Unknown user directory section"),
                }
                continue;
            }

            let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            let user = match compact.split_once(':') {
                Some((auth_id, equipment)) => {
                    let mut user = User::new(auth_id, section);
                    let (aircraft, vehicles) = parse_equipment(equipment);
                    if vehicles.is_none() {
                        warn!(auth_id, "Equipment list has no ground vehicle group");
                    }
                    user.assigned_aircraft = aircraft;
                    user.assigned_ground_vehicles = vehicles.unwrap_or_default();
                    user
                }
                None => User::new(compact.as_str(), section),
            };

            if user.auth_id.is_empty() {
                continue;
            }
            directory.users.insert(user.auth_id.clone(), user);
        }

        directory
    }

    pub fn get(&self, auth_id: &str) -> Option<&User> {
        self.users.get(auth_id)
    }

    /// Permission of a user, `Unset` when unknown.
    pub fn permission_of(&self, auth_id: &str) -> PermissionLevel {
        self.get(auth_id)
            .map(|u| u.permission)
            .unwrap_or(PermissionLevel::Unset)
    }

    /// Pre-assigned ground vehicles per user, skipping users with none.
    pub fn ground_vehicle_assignments(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.users
            .values()
            .filter(|u| !u.assigned_ground_vehicles.is_empty())
            .map(|u| (u.auth_id.as_str(), u.assigned_ground_vehicles.as_slice()))
    }

    /// Pre-assigned aircraft per user, skipping users with none.
    pub fn aircraft_assignments(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.users
            .values()
            .filter(|u| !u.assigned_aircraft.is_empty())
            .map(|u| (u.auth_id.as_str(), u.assigned_aircraft.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn split_ids(group: &str) -> Vec<String> {
    group
        .split(',')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_equipment(equipment: &str) -> (Vec<String>, Option<Vec<String>>) {
    match equipment.split_once("},{") {
        Some((aircraft, vehicles)) => (
            split_ids(aircraft.trim_start_matches('{')),
            Some(split_ids(vehicles.trim_end_matches('}'))),
        ),
        None => (
            split_ids(equipment.trim_start_matches('{').trim_end_matches('}')),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Simlink users
[Administrator]
admin
[Simulation_Admin]
sim1
[Normal_User]
user1:{AC_1, AC_2},{GV_1,GV_2}
user2
";

    #[test]
    fn parses_sections_and_assignments() {
        let directory = UserDirectory::parse(SAMPLE);

        assert_eq!(directory.permission_of("admin"), PermissionLevel::Administrator);
        assert_eq!(directory.permission_of("sim1"), PermissionLevel::SimulationAdmin);
        assert_eq!(directory.permission_of("user2"), PermissionLevel::NormalUser);

        let user1 = directory.get("user1").unwrap();
        assert_eq!(user1.permission, PermissionLevel::NormalUser);
        assert_eq!(user1.assigned_aircraft, vec!["AC_1", "AC_2"]);
        assert_eq!(user1.assigned_ground_vehicles, vec!["GV_1", "GV_2"]);
    }

    #[test]
    fn localhost_admin_always_present() {
        let directory = UserDirectory::parse("");
        assert_eq!(
            directory.permission_of(LOCALHOST_ADMIN),
            PermissionLevel::Administrator
        );
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn unknown_user_has_unset_permission() {
        let directory = UserDirectory::parse(SAMPLE);
        assert_eq!(directory.permission_of("nobody"), PermissionLevel::Unset);
    }

    #[test]
    fn aircraft_only_list_is_accepted() {
        let directory = UserDirectory::parse("[Normal_User]\npilot:{AC_9}\n");
        let pilot = directory.get("pilot").unwrap();
        assert_eq!(pilot.assigned_aircraft, vec!["AC_9"]);
        assert!(pilot.assigned_ground_vehicles.is_empty());
    }

    #[test]
    fn assignments_iterators_skip_empty_users() {
        let directory = UserDirectory::parse(SAMPLE);
        let vehicles: Vec<_> = directory.ground_vehicle_assignments().collect();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].0, "user1");
        assert_eq!(directory.aircraft_assignments().count(), 1);
    }
}

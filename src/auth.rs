//! Capability-set authorization consulted by the command layer.

use std::collections::HashSet;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServiceError;

/// Capabilities a user can hold; moderator commands require one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// End, finalize, cancel matches and correct race results.
    ModerateMatches,
    /// Create, activate and close seasons.
    ManageSeasons,
    /// Create and toggle recurring match templates.
    ManageSchedule,
    /// Trigger bulk rating recalculation.
    RecalculateRatings,
}

/// Capability sets per user, seeded from configuration.
///
/// The state machine itself never consults this: the check happens once at
/// the command boundary, before a core operation is invoked.
#[derive(Default)]
pub struct CapabilityRegistry {
    grants: DashMap<Uuid, HashSet<Permission>>,
}

impl CapabilityRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a capability to a user.
    pub fn grant(&self, user_id: Uuid, permission: Permission) {
        self.grants.entry(user_id).or_default().insert(permission);
    }

    /// Whether the user holds the capability.
    pub fn allows(&self, user_id: Uuid, permission: Permission) -> bool {
        self.grants
            .get(&user_id)
            .is_some_and(|set| set.contains(&permission))
    }

    /// Fail with [`ServiceError::PermissionDenied`] unless the user holds the capability.
    pub fn require(&self, user_id: Uuid, permission: Permission) -> Result<(), ServiceError> {
        if self.allows(user_id, permission) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "user {user_id} lacks {permission:?}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_are_per_user_and_per_permission() {
        let registry = CapabilityRegistry::new();
        let moderator = Uuid::new_v4();
        let player = Uuid::new_v4();

        registry.grant(moderator, Permission::ModerateMatches);

        assert!(registry.require(moderator, Permission::ModerateMatches).is_ok());
        assert!(matches!(
            registry.require(moderator, Permission::ManageSeasons),
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(registry.require(player, Permission::ModerateMatches).is_err());
    }
}

use crate::enforcer::Enforcer;
use crate::error::{PolicyError, Result};
use crate::model::{is_identity_subject, Permission, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Raw, unclamped pagination parameters as received from a caller.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListRoleParams {
    pub offset: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListRoleReply {
    pub total_count: usize,
    pub roles: Vec<Role>,
}

/// A role→permission group declared in configuration.
///
/// `apis` seed the shared role itself; `idapis` are the identity-scoped
/// subset copied into a user's private role on registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticGroup {
    pub name: String,
    #[serde(default)]
    pub apis: Vec<Permission>,
    #[serde(default)]
    pub idapis: Vec<Permission>,
}

/// The stable policy interface consumed by the rest of the system.
///
/// Wraps [`Enforcer`] with pagination normalization, the reserved identity
/// namespace check, and the two composite startup/registration helpers.
#[derive(Clone)]
pub struct RoleManager {
    enforcer: Arc<Enforcer>,
}

impl RoleManager {
    pub fn new(enforcer: Arc<Enforcer>) -> Self {
        Self { enforcer }
    }

    pub fn enforcer(&self) -> &Arc<Enforcer> {
        &self.enforcer
    }

    /// Create a declared role. Names in the reserved identity namespace
    /// are rejected so a declared role can never collide with a user's
    /// private role.
    pub async fn create_role(&self, role: &Role) -> Result<bool> {
        if is_identity_subject(&role.name) {
            return Err(PolicyError::ReservedRoleName);
        }
        self.enforcer.create_role(role).await
    }

    pub async fn delete_role(&self, name: &str) -> Result<bool> {
        self.enforcer.delete_role(name).await
    }

    pub fn get_role_by_name(&self, name: &str) -> Role {
        self.enforcer.get_role_by_name(name)
    }

    /// List declared roles with normalized pagination: `count` clamped to
    /// (0, 64] with a default of 16, negative offsets treated as zero.
    pub fn list_role(&self, params: &ListRoleParams) -> ListRoleReply {
        let offset = params.offset.max(0) as usize;
        let count = if params.count <= 0 || params.count > 64 {
            16
        } else {
            params.count as usize
        };

        let (roles, total_count) = self.enforcer.list_role(offset, count);
        ListRoleReply { total_count, roles }
    }

    pub async fn add_role_for_user(&self, user: &str, role: &str) -> Result<bool> {
        self.enforcer.add_role_for_user(user, role).await
    }

    pub async fn del_role_for_user(&self, user: &str, role: &str) -> Result<bool> {
        self.enforcer.del_role_for_user(user, role).await
    }

    pub fn has_role_for_user(&self, user: &str, role: &str) -> bool {
        self.enforcer.has_role_for_user(user, role)
    }

    pub fn get_role_for_user(&self, user: &str) -> Vec<String> {
        self.enforcer.get_role_for_user(user)
    }

    pub fn get_user_for_role(&self, role: &str) -> Vec<String> {
        self.enforcer.get_user_for_role(role)
    }

    pub fn validate(&self, subject: &str, permission: &Permission) -> bool {
        self.enforcer.validate(subject, permission)
    }

    /// Idempotently ensure the declared role groups exist. "Nothing
    /// changed" outcomes are expected on every start after the first.
    pub async fn apply_static_policy(&self, groups: &[StaticGroup]) -> Result<()> {
        for group in groups {
            let role = Role {
                name: group.name.clone(),
                permissions: group.apis.clone(),
            };
            let created = self.create_role(&role).await?;
            debug!(role = %group.name, created, "applied static role group");
        }
        Ok(())
    }

    /// Create the identity-named private role for `user_id`, populated
    /// from the template group's identity-scoped permissions.
    ///
    /// This is how per-user authorization is layered on top of role-based
    /// authorization without extending the permission-matching grammar:
    /// the user id itself becomes a role name in the reserved namespace.
    pub async fn grant_private_access(
        &self,
        user_id: &str,
        groups: &[StaticGroup],
        group_name: &str,
    ) -> Result<()> {
        let group = groups
            .iter()
            .find(|g| g.name == group_name)
            .ok_or(PolicyError::RoleNotExists)?;

        let role = Role {
            name: user_id.to_string(),
            permissions: group.idapis.clone(),
        };
        // bypasses the facade's reserved-namespace check on purpose
        self.enforcer.create_role(&role).await?;
        Ok(())
    }
}

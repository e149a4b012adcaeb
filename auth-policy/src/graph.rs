use crate::model::{Permission, PolicyRow, RowKind};
use std::collections::BTreeMap;

/// The immutable in-memory policy value all authorization checks run against.
///
/// A graph is never mutated in place once published: writers clone the
/// current value, apply a change, and swap the shared `Arc` (see
/// [`crate::Enforcer`]). Subjects iterate in lexicographic order so
/// pagination is stable across snapshots.
#[derive(Debug, Clone, Default)]
pub struct PolicyGraph {
    /// subject -> permissions, in fact insertion order per subject
    permissions: BTreeMap<String, Vec<Permission>>,
    /// user -> role names, in assignment order
    user_roles: BTreeMap<String, Vec<String>>,
    /// role -> user ids, in assignment order
    role_users: BTreeMap<String, Vec<String>>,
}

impl PolicyGraph {
    pub fn from_rows(rows: &[PolicyRow]) -> Self {
        let mut graph = Self::default();
        for row in rows {
            match row.kind {
                RowKind::Permission => {
                    graph.add_permission(&row.v0, Permission::new(&row.v1, &row.v2));
                }
                RowKind::Grouping => {
                    graph.add_assignment(&row.v0, &row.v1);
                }
            }
        }
        graph
    }

    /// Subjects holding at least one permission fact, sorted by name.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.permissions.keys().map(String::as_str)
    }

    pub fn subject_exists(&self, name: &str) -> bool {
        self.permissions.contains_key(name)
    }

    pub fn permissions_for(&self, subject: &str) -> &[Permission] {
        self.permissions.get(subject).map_or(&[], Vec::as_slice)
    }

    pub fn has_permission(&self, subject: &str, permission: &Permission) -> bool {
        self.permissions_for(subject).contains(permission)
    }

    /// Insert a permission fact. Returns `false` when the fact already exists.
    pub fn add_permission(&mut self, subject: &str, permission: Permission) -> bool {
        let facts = self.permissions.entry(subject.to_string()).or_default();
        if facts.contains(&permission) {
            return false;
        }
        facts.push(permission);
        true
    }

    /// Remove every fact owned by or referencing `name`: its permission
    /// facts and any grouping fact where it appears on either side.
    /// Returns `false` when nothing referenced the subject.
    pub fn remove_subject(&mut self, name: &str) -> bool {
        let mut removed = self.permissions.remove(name).is_some();

        if let Some(roles) = self.user_roles.remove(name) {
            removed = removed || !roles.is_empty();
            for role in roles {
                if let Some(users) = self.role_users.get_mut(&role) {
                    users.retain(|u| u != name);
                }
            }
        }

        if let Some(users) = self.role_users.remove(name) {
            removed = removed || !users.is_empty();
            for user in users {
                if let Some(roles) = self.user_roles.get_mut(&user) {
                    roles.retain(|r| r != name);
                }
            }
        }

        removed
    }

    pub fn has_assignment(&self, user: &str, role: &str) -> bool {
        self.user_roles
            .get(user)
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }

    /// Insert an assignment fact. Returns `false` when already held.
    pub fn add_assignment(&mut self, user: &str, role: &str) -> bool {
        if self.has_assignment(user, role) {
            return false;
        }
        self.user_roles
            .entry(user.to_string())
            .or_default()
            .push(role.to_string());
        self.role_users
            .entry(role.to_string())
            .or_default()
            .push(user.to_string());
        true
    }

    /// Remove an assignment fact. Returns `false` when it was not held.
    pub fn remove_assignment(&mut self, user: &str, role: &str) -> bool {
        if !self.has_assignment(user, role) {
            return false;
        }
        if let Some(roles) = self.user_roles.get_mut(user) {
            roles.retain(|r| r != role);
        }
        if let Some(users) = self.role_users.get_mut(role) {
            users.retain(|u| u != user);
        }
        true
    }

    pub fn roles_for(&self, user: &str) -> Vec<String> {
        self.user_roles.get(user).cloned().unwrap_or_default()
    }

    pub fn users_for(&self, role: &str) -> Vec<String> {
        self.role_users.get(role).cloned().unwrap_or_default()
    }

    /// The point authorization query: does the subject's own permission set,
    /// or any held role's set, contain an exact (resource, method) match?
    pub fn allows(&self, subject: &str, permission: &Permission) -> bool {
        if self.has_permission(subject, permission) {
            return true;
        }
        self.user_roles
            .get(subject)
            .is_some_and(|roles| roles.iter().any(|r| self.has_permission(r, permission)))
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An allowed (resource path, HTTP method) pair.
///
/// Matching is exact string equality on both fields. Resource paths are
/// stored as authored, parameterized segments included (e.g. `/v1/user/:id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub method: String,
}

impl Permission {
    pub fn new(resource: &str, method: &str) -> Self {
        Self {
            resource: resource.to_string(),
            method: method.to_string(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.resource)
    }
}

/// A named, reusable bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Whether a subject name lives in the reserved identity namespace.
///
/// User ids are UUIDs; a role named by a UUID is an identity-scoped private
/// role rather than a declared role.
pub fn is_identity_subject(name: &str) -> bool {
    Uuid::parse_str(name).is_ok()
}

/// Row kind in the raw policy store: a permission fact or a grouping fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// `p, subject, resource, method`
    Permission,
    /// `g, user, role`
    Grouping,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Permission => "p",
            RowKind::Grouping => "g",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "p" => Some(RowKind::Permission),
            "g" => Some(RowKind::Grouping),
            _ => None,
        }
    }
}

/// One raw policy fact as persisted by a [`crate::PolicyStore`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRow {
    pub kind: RowKind,
    pub v0: String,
    pub v1: String,
    pub v2: String,
}

impl PolicyRow {
    pub fn permission(subject: &str, resource: &str, method: &str) -> Self {
        Self {
            kind: RowKind::Permission,
            v0: subject.to_string(),
            v1: resource.to_string(),
            v2: method.to_string(),
        }
    }

    pub fn grouping(user: &str, role: &str) -> Self {
        Self {
            kind: RowKind::Grouping,
            v0: user.to_string(),
            v1: role.to_string(),
            v2: String::new(),
        }
    }

    /// Render the row in the line-oriented policy file format.
    pub fn to_line(&self) -> String {
        match self.kind {
            RowKind::Permission => format!("p, {}, {}, {}", self.v0, self.v1, self.v2),
            RowKind::Grouping => format!("g, {}, {}", self.v0, self.v1),
        }
    }

    /// Parse a policy file line. Blank lines and `#` comments yield `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut parts = line.split(',').map(str::trim);
        let kind = RowKind::from_str(parts.next()?)?;
        let v0 = parts.next()?.to_string();
        let v1 = parts.next()?.to_string();
        match kind {
            RowKind::Permission => {
                let v2 = parts.next()?.to_string();
                Some(Self { kind, v0, v1, v2 })
            }
            RowKind::Grouping => Some(Self {
                kind,
                v0,
                v1,
                v2: String::new(),
            }),
        }
    }
}

impl fmt::Display for PolicyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

/// A single durable change to the policy row set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyMutation {
    AddPermission {
        subject: String,
        permission: Permission,
    },
    /// Cascading delete: every permission fact owned by the subject and
    /// every grouping fact referencing it on either side.
    RemoveSubject { subject: String },
    AddAssignment { user: String, role: String },
    RemoveAssignment { user: String, role: String },
}

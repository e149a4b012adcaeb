use crate::error::{PolicyError, Result};
use crate::graph::PolicyGraph;
use crate::model::{is_identity_subject, Permission, PolicyMutation, Role};
use crate::store::PolicyStore;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Upper bound on a single store load so a slow backend cannot starve
/// writers across a reload.
const RELOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the canonical in-memory policy graph and answers authorization
/// queries against it.
///
/// Readers take a snapshot (`Arc` clone) of the current graph and never
/// coordinate with writers beyond that. Mutations and reloads serialize on
/// a writer lock, build the next graph off to the side, persist through
/// the [`PolicyStore`], and publish it with a single atomic swap — a
/// concurrent reader observes either the pre- or post-mutation graph,
/// never a partial one.
pub struct Enforcer {
    store: PolicyStore,
    graph: RwLock<Arc<PolicyGraph>>,
    writer: tokio::sync::Mutex<()>,
}

impl Enforcer {
    /// Load the full policy from the store and build the initial graph.
    pub async fn new(store: PolicyStore) -> Result<Self> {
        let rows = store.load().await?;
        Ok(Self {
            store,
            graph: RwLock::new(Arc::new(PolicyGraph::from_rows(&rows))),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// The current policy snapshot. Cheap; safe to hold across awaits.
    pub fn snapshot(&self) -> Arc<PolicyGraph> {
        self.graph.read().clone()
    }

    fn publish(&self, next: PolicyGraph) {
        *self.graph.write() = Arc::new(next);
    }

    /// Replace the in-memory graph with the store's current contents.
    ///
    /// Policy authored out-of-band becomes visible here without a restart.
    /// On failure the last-known-good graph stays in place.
    pub async fn reload(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let rows = tokio::time::timeout(RELOAD_TIMEOUT, self.store.load())
            .await
            .map_err(|_| PolicyError::StoreTimeout)??;
        self.publish(PolicyGraph::from_rows(&rows));
        Ok(())
    }

    /// Spawn the periodic reload task. Failures are logged and retried on
    /// the next tick; they never reach request handling.
    pub fn spawn_reload(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        let enforcer = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately; the initial load
            // already happened in `new`
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = enforcer.reload().await {
                    warn!(error = %err, "policy reload failed, keeping last snapshot");
                }
            }
        })
    }

    /// Insert a policy fact per permission in the role.
    ///
    /// Returns `Ok(false)` when every fact already existed — a non-fatal
    /// "nothing changed" signal, not an error.
    pub async fn create_role(&self, role: &Role) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let mut next = (*self.snapshot()).clone();

        let mut changed = false;
        for permission in &role.permissions {
            if next.add_permission(&role.name, permission.clone()) {
                self.store
                    .apply(&PolicyMutation::AddPermission {
                        subject: role.name.clone(),
                        permission: permission.clone(),
                    })
                    .await?;
                changed = true;
            }
        }

        if changed {
            info!(role = %role.name, "created role permissions");
            self.publish(next);
        }
        Ok(changed)
    }

    /// Remove the role's permission facts and every assignment referencing
    /// it, atomically from the caller's point of view.
    ///
    /// Returns `Ok(false)` when the role did not exist.
    pub async fn delete_role(&self, name: &str) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let mut next = (*self.snapshot()).clone();

        if !next.remove_subject(name) {
            return Ok(false);
        }
        self.store
            .apply(&PolicyMutation::RemoveSubject {
                subject: name.to_string(),
            })
            .await?;
        info!(role = %name, "deleted role");
        self.publish(next);
        Ok(true)
    }

    /// Reconstruct a role from the permission facts attached to `name`.
    ///
    /// An unknown name yields a role with an empty permission set; callers
    /// distinguish that from "role with zero permissions" only by use.
    pub fn get_role_by_name(&self, name: &str) -> Role {
        let graph = self.snapshot();
        Role {
            name: name.to_string(),
            permissions: graph.permissions_for(name).to_vec(),
        }
    }

    /// Window over the declared (non-identity) subjects.
    ///
    /// `total` is the candidate count before windowing; entries inside the
    /// window whose reconstructed role has no permissions are skipped.
    /// Offset/count normalization is owned by [`crate::RoleManager`].
    pub fn list_role(&self, offset: usize, count: usize) -> (Vec<Role>, usize) {
        let graph = self.snapshot();
        let names: Vec<&str> = graph
            .subjects()
            .filter(|name| !is_identity_subject(name))
            .collect();

        let total = names.len();
        let start = offset.min(total);
        let end = (offset + count).min(total);

        let roles = names[start..end]
            .iter()
            .map(|name| Role {
                name: (*name).to_string(),
                permissions: graph.permissions_for(name).to_vec(),
            })
            .filter(|role| !role.permissions.is_empty())
            .collect();
        (roles, total)
    }

    /// Grant `role` to `user`.
    ///
    /// Fails with [`PolicyError::RoleNotExists`] when the role has no
    /// policy facts at all, and with [`PolicyError::UserHasRole`] when the
    /// assignment is already held (idempotent-safe signal).
    pub async fn add_role_for_user(&self, user: &str, role: &str) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let mut next = (*self.snapshot()).clone();

        if !next.subject_exists(role) {
            return Err(PolicyError::RoleNotExists);
        }
        if !next.add_assignment(user, role) {
            return Err(PolicyError::UserHasRole);
        }
        self.store
            .apply(&PolicyMutation::AddAssignment {
                user: user.to_string(),
                role: role.to_string(),
            })
            .await?;
        info!(user = %user, role = %role, "added role for user");
        self.publish(next);
        Ok(true)
    }

    /// Revoke `role` from `user`. Fails with
    /// [`PolicyError::UserNotHaveRole`] when the assignment did not exist.
    pub async fn del_role_for_user(&self, user: &str, role: &str) -> Result<bool> {
        let _writer = self.writer.lock().await;
        let mut next = (*self.snapshot()).clone();

        if !next.remove_assignment(user, role) {
            return Err(PolicyError::UserNotHaveRole);
        }
        self.store
            .apply(&PolicyMutation::RemoveAssignment {
                user: user.to_string(),
                role: role.to_string(),
            })
            .await?;
        info!(user = %user, role = %role, "removed role from user");
        self.publish(next);
        Ok(true)
    }

    pub fn has_role_for_user(&self, user: &str, role: &str) -> bool {
        self.snapshot().has_assignment(user, role)
    }

    pub fn get_role_for_user(&self, user: &str) -> Vec<String> {
        self.snapshot().roles_for(user)
    }

    pub fn get_user_for_role(&self, role: &str) -> Vec<String> {
        self.snapshot().users_for(role)
    }

    /// The hot path: true iff any role held by `subject` (or the subject's
    /// own private facts) carries an exactly matching permission.
    pub fn validate(&self, subject: &str, permission: &Permission) -> bool {
        self.snapshot().allows(subject, permission)
    }
}

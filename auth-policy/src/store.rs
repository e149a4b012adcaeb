use crate::error::{PolicyError, Result};
use crate::model::{PolicyMutation, PolicyRow, RowKind};
use sqlx::{PgPool, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable backing for raw policy rows.
///
/// The backend is a closed set chosen once at configuration time; there is
/// no behavioral difference above this layer other than reload cost. This
/// layer does no caching and no validation.
pub enum PolicyStore {
    File(FilePolicyStore),
    Postgres(PostgresPolicyStore),
    Memory(MemoryPolicyStore),
}

impl PolicyStore {
    /// Read the full row set.
    pub async fn load(&self) -> Result<Vec<PolicyRow>> {
        match self {
            PolicyStore::File(store) => store.load().await,
            PolicyStore::Postgres(store) => store.load().await,
            PolicyStore::Memory(store) => Ok(store.load()),
        }
    }

    /// Durably apply one mutation.
    pub async fn apply(&self, mutation: &PolicyMutation) -> Result<()> {
        debug!(?mutation, "applying policy mutation");
        match self {
            PolicyStore::File(store) => store.apply(mutation).await,
            PolicyStore::Postgres(store) => store.apply(mutation).await,
            PolicyStore::Memory(store) => {
                store.apply(mutation);
                Ok(())
            }
        }
    }
}

/// Apply a mutation to a plain row set. Shared by the file and memory
/// backends, which both hold the full set at hand.
fn apply_to_rows(rows: &mut Vec<PolicyRow>, mutation: &PolicyMutation) {
    match mutation {
        PolicyMutation::AddPermission { subject, permission } => {
            let row = PolicyRow::permission(subject, &permission.resource, &permission.method);
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        PolicyMutation::RemoveSubject { subject } => {
            rows.retain(|row| match row.kind {
                RowKind::Permission => row.v0 != *subject,
                RowKind::Grouping => row.v0 != *subject && row.v1 != *subject,
            });
        }
        PolicyMutation::AddAssignment { user, role } => {
            let row = PolicyRow::grouping(user, role);
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        PolicyMutation::RemoveAssignment { user, role } => {
            rows.retain(|row| {
                row.kind != RowKind::Grouping || row.v0 != *user || row.v1 != *role
            });
        }
    }
}

/// Line-oriented policy file backend (`p, subject, resource, method` and
/// `g, user, role` rows). Rewrites go through a temp file and rename so a
/// crashed write never leaves a torn policy file behind.
pub struct FilePolicyStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FilePolicyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<PolicyRow>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PolicyError::Io(err)),
        };
        Ok(content.lines().filter_map(PolicyRow::from_line).collect())
    }

    async fn apply(&self, mutation: &PolicyMutation) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;
        apply_to_rows(&mut rows, mutation);

        let mut content = rows
            .iter()
            .map(PolicyRow::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Relational backend over a `policy_rules` table with the same row shape
/// as the policy file.
pub struct PostgresPolicyStore {
    pool: PgPool,
}

impl PostgresPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table when it is not present.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS policy_rules (
                id BIGSERIAL PRIMARY KEY,
                ptype TEXT NOT NULL,
                v0 TEXT NOT NULL,
                v1 TEXT NOT NULL,
                v2 TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<PolicyRow>> {
        let records = sqlx::query("SELECT ptype, v0, v1, v2 FROM policy_rules ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let ptype: String = record.try_get("ptype")?;
            let Some(kind) = RowKind::from_str(&ptype) else {
                continue;
            };
            rows.push(PolicyRow {
                kind,
                v0: record.try_get("v0")?,
                v1: record.try_get("v1")?,
                v2: record.try_get("v2")?,
            });
        }
        Ok(rows)
    }

    async fn apply(&self, mutation: &PolicyMutation) -> Result<()> {
        match mutation {
            PolicyMutation::AddPermission { subject, permission } => {
                sqlx::query(
                    "INSERT INTO policy_rules (ptype, v0, v1, v2) VALUES ('p', $1, $2, $3)",
                )
                .bind(subject)
                .bind(&permission.resource)
                .bind(&permission.method)
                .execute(&self.pool)
                .await?;
            }
            PolicyMutation::RemoveSubject { subject } => {
                sqlx::query(
                    "DELETE FROM policy_rules \
                     WHERE (ptype = 'p' AND v0 = $1) \
                        OR (ptype = 'g' AND (v0 = $1 OR v1 = $1))",
                )
                .bind(subject)
                .execute(&self.pool)
                .await?;
            }
            PolicyMutation::AddAssignment { user, role } => {
                sqlx::query(
                    "INSERT INTO policy_rules (ptype, v0, v1) VALUES ('g', $1, $2)",
                )
                .bind(user)
                .bind(role)
                .execute(&self.pool)
                .await?;
            }
            PolicyMutation::RemoveAssignment { user, role } => {
                sqlx::query(
                    "DELETE FROM policy_rules WHERE ptype = 'g' AND v0 = $1 AND v1 = $2",
                )
                .bind(user)
                .bind(role)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}

/// In-memory backend for tests and single-process development.
#[derive(Default)]
pub struct MemoryPolicyStore {
    rows: parking_lot::RwLock<Vec<PolicyRow>>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<PolicyRow>) -> Self {
        Self {
            rows: parking_lot::RwLock::new(rows),
        }
    }

    pub fn load(&self) -> Vec<PolicyRow> {
        self.rows.read().clone()
    }

    pub fn apply(&self, mutation: &PolicyMutation) {
        apply_to_rows(&mut self.rows.write(), mutation);
    }
}

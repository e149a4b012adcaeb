//! Role-based access control engine for Gatehouse Engine
//!
//! This module provides the authorization core of the account service:
//! - Roles as named bundles of (resource, method) permissions
//! - Many-to-many user/role assignment with idempotency signals
//! - Point authorization checks against an in-memory policy graph
//! - Durable policy persistence (file, Postgres, or in-memory backends)
//! - Periodic background reload with atomic snapshot swap
//!
//! # Core Concepts
//!
//! - **Permission**: an allowed (resource path, HTTP method) pair
//! - **Role**: a uniquely named, ordered set of permissions
//! - **Assignment**: a user-to-role grant
//! - **Policy graph**: the immutable in-memory value all checks run against
//!
//! A role name that parses as a UUID is reserved for identity-scoped
//! private roles and cannot be created through [`RoleManager::create_role`].
//!
//! # Example
//!
//! ```no_run
//! use auth_policy::{Enforcer, MemoryPolicyStore, Permission, PolicyStore, Role, RoleManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PolicyStore::Memory(MemoryPolicyStore::new());
//!     let enforcer = Arc::new(Enforcer::new(store).await?);
//!     let manager = RoleManager::new(enforcer);
//!
//!     let role = Role::new("operator")
//!         .with_permission(Permission::new("/v1/role", "GET"));
//!     manager.create_role(&role).await?;
//!     manager.add_role_for_user("6e8bc430-9c3a-4d39-8b54-5ad8a1c0aabc", "operator").await?;
//!
//!     let allowed = manager.validate(
//!         "6e8bc430-9c3a-4d39-8b54-5ad8a1c0aabc",
//!         &Permission::new("/v1/role", "GET"),
//!     );
//!     assert!(allowed);
//!     Ok(())
//! }
//! ```

pub mod enforcer;
pub mod error;
pub mod graph;
pub mod manager;
pub mod model;
pub mod store;

pub use enforcer::*;
pub use error::*;
pub use graph::*;
pub use manager::*;
pub use model::*;
pub use store::*;

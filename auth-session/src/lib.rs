//! Token session management for Gatehouse Engine
//!
//! This module establishes identity for the account service:
//! - Credential login against the external user store (username with
//!   email fallback, constant-time password comparison)
//! - Signed, expiring JWT issuance with a configurable identity claim
//! - Per-request verification and subject → domain-user resolution
//! - Token refresh inside a configured window past issuance
//! - Configurable token transport (header, query, cookie) with a fixed
//!   lookup precedence
//!
//! Tokens carry the subject only — never role information — so
//! authorization is always re-evaluated against current policy state.

pub mod claims;
pub mod error;
pub mod extract;
pub mod options;
pub mod service;
pub mod store;

pub use claims::*;
pub use error::*;
pub use extract::*;
pub use options::*;
pub use service::*;
pub use store::*;

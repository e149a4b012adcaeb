//! Outbound email boundary for Gatehouse Engine
//!
//! A deliberately thin wrapper: the account service only ever sends
//! templated one-time-code messages (registration, password reset).
//! Templates are handlebars sources declared in configuration; transports
//! are SMTP for deployments and an in-memory capture for tests.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;

//! Gatehouse Engine HTTP server
//!
//! The account service front end: axum routing and handlers over the
//! authorization core (`auth-policy`), the token session layer
//! (`auth-session`), the one-time-code cache (`cache-store`), and the
//! outbound mail boundary (`email-service`).

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

use crate::server::GatehouseServer;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthReply {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_seconds: i64,
}

pub async fn health_check(State(server): State<GatehouseServer>) -> Json<HealthReply> {
    Json(HealthReply {
        name: "gatehouse-server",
        version: env!("CARGO_PKG_VERSION"),
        status: "healthy",
        uptime_seconds: (Utc::now() - server.started_at).num_seconds(),
    })
}

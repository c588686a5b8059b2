use axum::{extract::State, Json};
use serde::Serialize;
use crate::admin::AdminState;
use crate::health::TickReport;
use crate::load_balancer::BackendStatus;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub backends_total: usize,
    pub backends_alive: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let alive = state.pool.alive_count();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if alive > 0 { "operational" } else { "no backends available" },
        backends_total: state.pool.len(),
        backends_alive: alive,
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    Json(state.pool.snapshot())
}

pub async fn get_health(State(state): State<AdminState>) -> Json<TickReport> {
    Json(state.reports.borrow().clone())
}

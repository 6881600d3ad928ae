use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use crate::admin::AdminState;
use crate::health::{HealthError, Proxy, StatusCounts, SweepReport};
use crate::http::ApiResponse;
use crate::routing::router::RouteSummary;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub routes: usize,
    pub proxies: StatusCounts,
}

impl IntoResponse for HealthError {
    fn into_response(self) -> Response {
        let status = match self {
            HealthError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        ApiResponse::error(status, self.to_string()).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Result<Json<SystemStatus>, HealthError> {
    let counts = StatusCounts::tally(&state.engine.store().all().await?);

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        routes: state.routes.load().len(),
        proxies: counts,
    }))
}

pub async fn get_proxies(State(state): State<AdminState>) -> Result<Json<Vec<Proxy>>, HealthError> {
    Ok(Json(state.engine.store().all().await?))
}

pub async fn check_proxies(State(state): State<AdminState>) -> Result<Json<SweepReport>, HealthError> {
    Ok(Json(state.engine.check_all().await?))
}

/// Runs both halves of the cool-down cycle: ERROR → COOLDOWN, then aged COOLDOWN → ACTIVE.
pub async fn reset_cooldowns(State(state): State<AdminState>) -> Result<Json<serde_json::Value>, HealthError> {
    let cooled = state.engine.cool_down_errors().await?;
    let reset = state.engine.reset_cooldowns().await?;
    Ok(Json(serde_json::json!({ "cooled_down": cooled, "reset": reset })))
}

pub async fn reset_proxy(
    State(state): State<AdminState>,
    Path(id): Path<u64>,
) -> Result<Json<Proxy>, HealthError> {
    Ok(Json(state.engine.reset_proxy(id).await?))
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteSummary>> {
    Json(state.routes.load().summaries())
}

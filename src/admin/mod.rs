//! Admin API.
//!
//! Bearer-key protected endpoints to inspect proxies and routes and to drive
//! the health engine by hand.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
    middleware,
};
use crate::health::HealthEngine;
use crate::http::SharedRoutes;
use self::handlers::*;
use self::auth::admin_auth_middleware;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub engine: Arc<HealthEngine>,
    pub routes: SharedRoutes,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/proxies", get(get_proxies))
        .route("/admin/proxies/check", post(check_proxies))
        .route("/admin/proxies/reset-cooldowns", post(reset_cooldowns))
        .route("/admin/proxies/{id}/reset", post(reset_proxy))
        .route("/admin/routes", get(get_routes))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

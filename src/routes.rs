use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{accounts, alerts, auth, contacts, webhooks};

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(auth::register_user))
        .route("/api/login", post(auth::login_user))
        .route("/api/me", get(auth::current_user))
        .route("/api/account", delete(auth::delete_account))
        .route("/api/billing/webhook", post(webhooks::billing_webhook))
        .merge(accounts::routes())
        .merge(contacts::routes())
        .merge(alerts::routes())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::Value;

use super::dispatcher::AlertDispatcher;
use super::manifest::PublicSite;
use super::models::{AlertRequest, AlertSummary, PublicAlertOutcome, PublicAlertRequest, ReadinessReport};
use crate::error::{AppError, AppResult};
use crate::extractor::AuthUser;

pub fn routes() -> Router {
    Router::new()
        .route("/api/alerts", post(trigger_alert))
        .route("/api/public/:token/alert", post(trigger_public_alert))
        .route("/api/public/:token/readiness", get(public_readiness))
        .route("/api/public/:token/manifest.json", get(public_manifest))
}

pub async fn trigger_alert(
    Extension(dispatcher): Extension<AlertDispatcher>,
    AuthUser { user_id }: AuthUser,
    Json(payload): Json<AlertRequest>,
) -> AppResult<(StatusCode, Json<AlertSummary>)> {
    let summary = dispatcher.trigger_alert(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn trigger_public_alert(
    Extension(dispatcher): Extension<AlertDispatcher>,
    Path(token): Path<String>,
    Json(request): Json<PublicAlertRequest>,
) -> AppResult<Json<PublicAlertOutcome>> {
    Ok(Json(dispatcher.trigger_public_alert(&token, request).await?))
}

pub async fn public_readiness(
    Extension(dispatcher): Extension<AlertDispatcher>,
    Path(token): Path<String>,
) -> AppResult<Json<ReadinessReport>> {
    Ok(Json(dispatcher.check_public_alert_readiness(&token).await?))
}

pub async fn public_manifest(
    Extension(dispatcher): Extension<AlertDispatcher>,
    Extension(site): Extension<PublicSite>,
    Path(token): Path<String>,
) -> AppResult<Json<Value>> {
    let profile = dispatcher.resolve_token(&token).await?;
    let manifest = site
        .web_app_manifest(profile.public_token)
        .map_err(|err| AppError::Message(format!("failed to build manifest url: {err}")))?;
    Ok(Json(manifest))
}

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::service::AccountService;
use crate::entitlements::{self, EntitlementSummary};
use crate::error::AppResult;
use crate::extractor::AuthUser;

pub fn routes() -> Router {
    Router::new()
        .route("/api/entitlements", get(get_entitlements))
        .route("/api/trial", post(request_trial))
}

#[derive(Debug, Serialize)]
pub struct TrialResponse {
    pub trial_started_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

pub async fn get_entitlements(
    Extension(accounts): Extension<AccountService>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<EntitlementSummary>> {
    Ok(Json(accounts.entitlement_summary(user_id).await?))
}

pub async fn request_trial(
    Extension(accounts): Extension<AccountService>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<TrialResponse>> {
    let profile = accounts.request_trial(user_id).await?;
    Ok(Json(TrialResponse {
        trial_started_at: profile.trial_started_at,
        trial_ends_at: entitlements::trial_ends_at(&profile),
    }))
}

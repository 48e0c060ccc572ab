use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entitlements::Plan;

#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// key: profile-model -> plan flags, trial state, capability token
///
/// `public_token` is fixed at creation and `has_used_trial` only ever moves
/// from `false` to `true`; the stores never write either the other way.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user_id: i32,
    pub plan_tier: Plan,
    pub is_subscribed: bool,
    pub is_free_override: bool,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub has_used_trial: bool,
    pub payment_method_on_file: bool,
    pub external_customer_ref: Option<String>,
    #[serde(skip_serializing)]
    pub public_token: Uuid,
    #[serde(skip_serializing)]
    pub version: i64,
}

impl Profile {
    /// Fresh profile for a newly registered account.
    pub fn new(user_id: i32) -> Self {
        Self {
            user_id,
            plan_tier: Plan::None,
            is_subscribed: false,
            is_free_override: false,
            trial_started_at: None,
            has_used_trial: false,
            payment_method_on_file: false,
            external_customer_ref: None,
            public_token: Uuid::new_v4(),
            version: 0,
        }
    }
}

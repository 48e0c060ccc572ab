use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entitlements::Plan;

/// Append-only record of a triggered alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyAlert {
    pub id: i64,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub message: Option<String>,
    pub location: Option<String>,
    pub is_test: bool,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: i32,
    pub message: Option<String>,
    pub location: Option<String>,
    pub is_test: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_test: bool,
}

/// Body of the capability token trigger. `continuous` marks a location
/// heartbeat from an alert that is already running.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicAlertRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub continuous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub alert_id: i64,
    pub contacts_count: usize,
    pub successful_sends: u32,
    pub failed_sends: u32,
    pub location_shared: bool,
    pub plan: Plan,
    pub billing_skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublicAlertOutcome {
    Dispatched(AlertSummary),
    Heartbeat { location_received: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub plan: Plan,
    pub contact_count: i64,
    pub message: String,
}

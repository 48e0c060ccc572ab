use async_trait::async_trait;

use super::models::{EmergencyAlert, NewAlert};

/// key: alert-store -> append-only alert log
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, alert: &NewAlert) -> sqlx::Result<EmergencyAlert>;

    /// Non-test alerts of the user other than `alert_id`.
    async fn count_real_alerts_excluding(&self, user_id: i32, alert_id: i64) -> sqlx::Result<i64>;
}

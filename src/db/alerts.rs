use async_trait::async_trait;
use sqlx::Row;

use super::PgStore;
use crate::alerts::{AlertStore, EmergencyAlert, NewAlert};

#[async_trait]
impl AlertStore for PgStore {
    async fn insert_alert(&self, alert: &NewAlert) -> sqlx::Result<EmergencyAlert> {
        let row = sqlx::query(
            r#"
            INSERT INTO emergency_alerts (user_id, message, location, is_test)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, created_at, message, location, is_test
            "#,
        )
        .bind(alert.user_id)
        .bind(alert.message.as_deref())
        .bind(alert.location.as_deref())
        .bind(alert.is_test)
        .fetch_one(&self.pool)
        .await?;
        Ok(EmergencyAlert {
            id: row.get("id"),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            message: row.get("message"),
            location: row.get("location"),
            is_test: row.get("is_test"),
        })
    }

    async fn count_real_alerts_excluding(&self, user_id: i32, alert_id: i64) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM emergency_alerts WHERE user_id = $1 AND NOT is_test AND id <> $2",
        )
        .bind(user_id)
        .bind(alert_id)
        .fetch_one(&self.pool)
        .await
    }
}

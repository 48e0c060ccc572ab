use async_trait::async_trait;
use sqlx::{postgres::PgRow, Row};
use uuid::Uuid;

use super::{decode_plan, PgStore};
use crate::accounts::{Profile, ProfileStore};

const PROFILE_COLUMNS: &str = r#"
    user_id,
    plan_tier,
    is_subscribed,
    is_free_override,
    trial_started_at,
    has_used_trial,
    payment_method_on_file,
    external_customer_ref,
    public_token,
    version
"#;

#[async_trait]
impl ProfileStore for PgStore {
    async fn profile_for_user(&self, user_id: i32) -> sqlx::Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_row(&row)).transpose()
    }

    async fn profile_by_token(&self, token: Uuid) -> sqlx::Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE public_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_row(&row)).transpose()
    }

    async fn profile_by_customer_ref(&self, customer_ref: &str) -> sqlx::Result<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE external_customer_ref = $1"
        ))
        .bind(customer_ref)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_row(&row)).transpose()
    }

    async fn update_profile(&self, profile: &Profile) -> sqlx::Result<bool> {
        // public_token is never written; has_used_trial can only be raised.
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET plan_tier = $2,
                is_subscribed = $3,
                is_free_override = $4,
                trial_started_at = $5,
                has_used_trial = has_used_trial OR $6,
                payment_method_on_file = $7,
                external_customer_ref = $8,
                version = version + 1
            WHERE user_id = $1 AND version = $9
            "#,
        )
        .bind(profile.user_id)
        .bind(profile.plan_tier.as_str())
        .bind(profile.is_subscribed)
        .bind(profile.is_free_override)
        .bind(profile.trial_started_at)
        .bind(profile.has_used_trial)
        .bind(profile.payment_method_on_file)
        .bind(profile.external_customer_ref.as_deref())
        .bind(profile.version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn map_row(row: &PgRow) -> sqlx::Result<Profile> {
    Ok(Profile {
        user_id: row.try_get("user_id")?,
        plan_tier: decode_plan(row.try_get::<&str, _>("plan_tier")?)?,
        is_subscribed: row.try_get("is_subscribed")?,
        is_free_override: row.try_get("is_free_override")?,
        trial_started_at: row.try_get("trial_started_at")?,
        has_used_trial: row.try_get("has_used_trial")?,
        payment_method_on_file: row.try_get("payment_method_on_file")?,
        external_customer_ref: row.try_get("external_customer_ref")?,
        public_token: row.try_get("public_token")?,
        version: row.try_get("version")?,
    })
}

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Row};
use uuid::Uuid;

use super::{decode_plan, PgStore};
use crate::billing::{Subscription, SubscriptionStore, SubscriptionUpsert, ACTIVE_STATUS};

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn active_subscription(&self, user_id: i32) -> sqlx::Result<Option<Subscription>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, contact_email, external_customer_ref, external_subscription_ref,
                   plan, status, licensed_line_item_ref, metered_line_item_ref,
                   created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1 AND status = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(ACTIVE_STATUS)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_row(&row)).transpose()
    }

    async fn upsert_subscription(&self, input: &SubscriptionUpsert) -> sqlx::Result<Subscription> {
        let row = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id,
                user_id,
                contact_email,
                external_customer_ref,
                external_subscription_ref,
                plan,
                status,
                licensed_line_item_ref,
                metered_line_item_ref
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (external_customer_ref) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                contact_email = COALESCE(EXCLUDED.contact_email, subscriptions.contact_email),
                external_subscription_ref = EXCLUDED.external_subscription_ref,
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                licensed_line_item_ref = EXCLUDED.licensed_line_item_ref,
                metered_line_item_ref = EXCLUDED.metered_line_item_ref,
                updated_at = NOW()
            RETURNING id, user_id, contact_email, external_customer_ref, external_subscription_ref,
                      plan, status, licensed_line_item_ref, metered_line_item_ref,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.contact_email.as_deref())
        .bind(&input.external_customer_ref)
        .bind(&input.external_subscription_ref)
        .bind(input.plan.as_str())
        .bind(&input.status)
        .bind(&input.licensed_line_item_ref)
        .bind(input.metered_line_item_ref.as_deref())
        .fetch_one(&self.pool)
        .await?;
        map_row(&row)
    }
}

fn map_row(row: &PgRow) -> sqlx::Result<Subscription> {
    Ok(Subscription {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        contact_email: row.try_get("contact_email")?,
        external_customer_ref: row.try_get("external_customer_ref")?,
        external_subscription_ref: row.try_get("external_subscription_ref")?,
        plan: decode_plan(row.try_get::<&str, _>("plan")?)?,
        status: row.try_get("status")?,
        licensed_line_item_ref: row.try_get("licensed_line_item_ref")?,
        metered_line_item_ref: row.try_get("metered_line_item_ref")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

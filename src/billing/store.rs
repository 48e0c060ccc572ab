use async_trait::async_trait;

use super::models::{Subscription, SubscriptionUpsert};

/// key: subscription-store -> written by reconciliation, read by entitlements
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Most recently updated subscription with status `active` for the user.
    async fn active_subscription(&self, user_id: i32) -> sqlx::Result<Option<Subscription>>;

    /// Inserts or updates the row keyed by `external_customer_ref`.
    async fn upsert_subscription(&self, input: &SubscriptionUpsert) -> sqlx::Result<Subscription>;
}

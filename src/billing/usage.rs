use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::adapters::BillingProvider;
use super::store::SubscriptionStore;

/// key: billing-usage -> metered SMS reporting
#[async_trait]
pub trait UsageReporter: Send + Sync {
    async fn report_usage(&self, user_id: i32, quantity: u32) -> Result<()>;
}

/// Reports usage against the metered line item of the user's active
/// subscription.
#[derive(Clone)]
pub struct MeteredUsageReporter {
    subscriptions: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn BillingProvider>,
}

impl MeteredUsageReporter {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn BillingProvider>,
    ) -> Self {
        Self {
            subscriptions,
            provider,
        }
    }
}

#[async_trait]
impl UsageReporter for MeteredUsageReporter {
    async fn report_usage(&self, user_id: i32, quantity: u32) -> Result<()> {
        let subscription = self
            .subscriptions
            .active_subscription(user_id)
            .await
            .context("failed to load active subscription")?
            .ok_or_else(|| anyhow!("no active subscription for user {user_id}"))?;
        let line_item = subscription
            .metered_line_item_ref
            .as_deref()
            .ok_or_else(|| anyhow!("subscription {} has no metered line item", subscription.id))?;
        self.provider
            .report_usage(line_item, quantity, Utc::now())
            .await?;
        info!(%user_id, quantity, line_item, "usage reported");
        Ok(())
    }
}

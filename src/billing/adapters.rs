use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::models::{ProviderLineItem, ProviderSubscription};

/// key: billing-adapter -> payment provider integration
#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn fetch_subscription(&self, subscription_ref: &str) -> Result<ProviderSubscription>;

    async fn fetch_customer_email(&self, customer_ref: &str) -> Result<Option<String>>;

    async fn report_usage(
        &self,
        line_item_ref: &str,
        quantity: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
}

/// key: billing-adapter-stripe -> REST client, built once at startup
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    status: String,
    items: StripeList<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItem {
    id: String,
    price: StripePrice,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    #[serde(default)]
    email: Option<String>,
}

impl StripeClient {
    pub fn new(base_url: impl Into<String>, secret_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build payment provider client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            secret_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.secret_key {
            request.bearer_auth(key)
        } else {
            request
        }
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn fetch_subscription(&self, subscription_ref: &str) -> Result<ProviderSubscription> {
        let parsed: StripeSubscription = self
            .auth(
                self.client
                    .get(self.endpoint(&format!("v1/subscriptions/{subscription_ref}"))),
            )
            .send()
            .await
            .context("failed to contact payment provider")?
            .error_for_status()
            .context("payment provider rejected subscription lookup")?
            .json()
            .await
            .context("failed to decode subscription from payment provider")?;

        Ok(ProviderSubscription {
            id: parsed.id,
            customer_ref: parsed.customer,
            status: parsed.status,
            line_items: parsed
                .items
                .data
                .into_iter()
                .map(|item| ProviderLineItem {
                    id: item.id,
                    price_id: item.price.id,
                })
                .collect(),
        })
    }

    async fn fetch_customer_email(&self, customer_ref: &str) -> Result<Option<String>> {
        let parsed: StripeCustomer = self
            .auth(
                self.client
                    .get(self.endpoint(&format!("v1/customers/{customer_ref}"))),
            )
            .send()
            .await
            .context("failed to contact payment provider")?
            .error_for_status()
            .context("payment provider rejected customer lookup")?
            .json()
            .await
            .context("failed to decode customer from payment provider")?;
        Ok(parsed.email.filter(|email| !email.trim().is_empty()))
    }

    async fn report_usage(
        &self,
        line_item_ref: &str,
        quantity: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let form = [
            ("quantity", quantity.to_string()),
            ("timestamp", timestamp.timestamp().to_string()),
            ("action", "increment".to_string()),
        ];
        self.auth(self.client.post(self.endpoint(&format!(
            "v1/subscription_items/{line_item_ref}/usage_records"
        ))))
        .form(&form)
        .send()
        .await
        .context("failed to contact payment provider")?
        .error_for_status()
        .context("payment provider rejected usage record")?;
        Ok(())
    }
}

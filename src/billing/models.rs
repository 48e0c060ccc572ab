use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entitlements::Plan;

pub const ACTIVE_STATUS: &str = "active";

/// key: billing-subscription-model -> one row per provider subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Option<i32>,
    pub contact_email: Option<String>,
    pub external_customer_ref: String,
    pub external_subscription_ref: String,
    pub plan: Plan,
    pub status: String,
    pub licensed_line_item_ref: String,
    pub metered_line_item_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }
}

/// Upsert payload, keyed by `external_customer_ref`.
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub user_id: i32,
    pub contact_email: Option<String>,
    pub external_customer_ref: String,
    pub external_subscription_ref: String,
    pub plan: Plan,
    pub status: String,
    pub licensed_line_item_ref: String,
    pub metered_line_item_ref: Option<String>,
}

/// Subscription as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_ref: Option<String>,
    pub status: String,
    pub line_items: Vec<ProviderLineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLineItem {
    pub id: String,
    pub price_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemKind {
    Licensed(Plan),
    Metered,
}

/// key: billing-price-catalog -> configured provider price ids
#[derive(Debug, Clone, Default)]
pub struct PriceCatalog {
    pub basic_access_price: Option<String>,
    pub premium_access_price: Option<String>,
    pub sms_metered_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLineItems {
    pub plan: Plan,
    pub licensed_line_item_ref: String,
    pub metered_line_item_ref: Option<String>,
}

impl PriceCatalog {
    pub fn classify(&self, price_id: &str) -> Option<LineItemKind> {
        let matches = |configured: &Option<String>| configured.as_deref() == Some(price_id);
        if matches(&self.basic_access_price) {
            Some(LineItemKind::Licensed(Plan::Basic))
        } else if matches(&self.premium_access_price) {
            Some(LineItemKind::Licensed(Plan::Premium))
        } else if matches(&self.sms_metered_price) {
            Some(LineItemKind::Metered)
        } else {
            None
        }
    }

    /// Splits a subscription's items into the licensed access item and the
    /// optional metered add-on. The first licensed item in provider order
    /// decides the plan. Returns `None` when no item matches a plan price.
    pub fn classify_line_items(&self, items: &[ProviderLineItem]) -> Option<ClassifiedLineItems> {
        let mut licensed: Option<(Plan, &ProviderLineItem)> = None;
        let mut metered: Option<&ProviderLineItem> = None;
        for item in items {
            match self.classify(&item.price_id) {
                Some(LineItemKind::Licensed(plan)) if licensed.is_none() => {
                    licensed = Some((plan, item))
                }
                Some(LineItemKind::Metered) if metered.is_none() => metered = Some(item),
                _ => {}
            }
        }
        let (plan, licensed_item) = licensed?;
        Some(ClassifiedLineItems {
            plan,
            licensed_line_item_ref: licensed_item.id.clone(),
            metered_line_item_ref: metered.map(|item| item.id.clone()),
        })
    }
}

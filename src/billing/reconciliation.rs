use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::adapters::BillingProvider;
use super::models::{PriceCatalog, Subscription, SubscriptionUpsert, ACTIVE_STATUS};
use crate::accounts::{mutate_profile, ProfileMutationError};
use crate::db::Stores;
use crate::entitlements;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";

/// Provider event envelope. Only the fields reconciliation reads are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEventData {
    #[serde(default)]
    pub object: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingReferences,
    ProviderLookupFailed,
    NoPlanPrice,
    ProfileNotLinked,
    ProfileConflict,
    Storage,
}

#[derive(Debug, Clone)]
pub enum ReconciliationOutcome {
    Applied {
        subscription: Subscription,
        trial_started: bool,
    },
    Skipped(SkipReason),
    /// Event kinds that are observed but change no state.
    Acknowledged(String),
}

/// key: billing-reconciliation -> webhook driven subscription state
///
/// Never fails towards the caller: once a webhook is authenticated every
/// problem is logged and the event is acknowledged so the provider does not
/// redeliver it.
#[derive(Clone)]
pub struct SubscriptionReconciler {
    stores: Stores,
    provider: Arc<dyn BillingProvider>,
    catalog: PriceCatalog,
}

impl SubscriptionReconciler {
    pub fn new(stores: Stores, provider: Arc<dyn BillingProvider>, catalog: PriceCatalog) -> Self {
        Self {
            stores,
            provider,
            catalog,
        }
    }

    pub async fn handle_event(&self, event: &WebhookEvent) -> ReconciliationOutcome {
        info!(event_id = ?event.id, kind = %event.kind, "billing webhook received");
        match event.kind.as_str() {
            CHECKOUT_COMPLETED => self.checkout_completed(&event.data.object).await,
            SUBSCRIPTION_CREATED | SUBSCRIPTION_UPDATED => {
                // TODO: sync cancellations and downgrades once the status
                // transitions to honour are agreed with billing.
                let subscription = string_field(&event.data.object, "id");
                let status = string_field(&event.data.object, "status");
                info!(
                    kind = %event.kind,
                    ?subscription,
                    ?status,
                    "subscription lifecycle event observed"
                );
                ReconciliationOutcome::Acknowledged(event.kind.clone())
            }
            other => {
                warn!(kind = other, "unhandled billing webhook event");
                ReconciliationOutcome::Acknowledged(other.to_string())
            }
        }
    }

    async fn checkout_completed(&self, session: &Value) -> ReconciliationOutcome {
        let session_customer = string_field(session, "customer");
        let Some(subscription_ref) = string_field(session, "subscription") else {
            warn!(
                customer = ?session_customer,
                "checkout session without subscription reference"
            );
            return ReconciliationOutcome::Skipped(SkipReason::MissingReferences);
        };

        let provider_subscription = match self.provider.fetch_subscription(&subscription_ref).await
        {
            Ok(subscription) => subscription,
            Err(err) => {
                error!(?err, %subscription_ref, "failed to retrieve subscription from provider");
                return ReconciliationOutcome::Skipped(SkipReason::ProviderLookupFailed);
            }
        };

        let Some(customer_ref) = session_customer.or_else(|| provider_subscription.customer_ref.clone())
        else {
            warn!(%subscription_ref, "checkout session without customer reference");
            return ReconciliationOutcome::Skipped(SkipReason::MissingReferences);
        };

        let Some(items) = self
            .catalog
            .classify_line_items(&provider_subscription.line_items)
        else {
            let prices: Vec<&str> = provider_subscription
                .line_items
                .iter()
                .map(|item| item.price_id.as_str())
                .collect();
            warn!(
                %subscription_ref,
                ?prices,
                "no subscription line item matches a configured plan price"
            );
            return ReconciliationOutcome::Skipped(SkipReason::NoPlanPrice);
        };

        let contact_email = match self.provider.fetch_customer_email(&customer_ref).await {
            Ok(email) => email,
            Err(err) => {
                warn!(?err, %customer_ref, "could not fetch customer email, continuing without it");
                None
            }
        };

        let profile = match self.stores.profiles.profile_by_customer_ref(&customer_ref).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                error!(%customer_ref, "no profile linked to provider customer");
                return ReconciliationOutcome::Skipped(SkipReason::ProfileNotLinked);
            }
            Err(err) => {
                error!(?err, %customer_ref, "failed to resolve profile for provider customer");
                return ReconciliationOutcome::Skipped(SkipReason::Storage);
            }
        };
        let user_id = profile.user_id;

        let now = Utc::now();
        let trial_started = match mutate_profile(
            self.stores.profiles.as_ref(),
            user_id,
            |profile| -> Result<bool, Infallible> {
                profile.payment_method_on_file = true;
                Ok(entitlements::activate_trial_unchecked(profile, now))
            },
        )
        .await
        {
            Ok((_, trial_started)) => trial_started,
            Err(ProfileMutationError::Conflict) => {
                error!(%user_id, "gave up updating profile after repeated version conflicts");
                return ReconciliationOutcome::Skipped(SkipReason::ProfileConflict);
            }
            Err(err) => {
                error!(?err, %user_id, "failed to update profile from checkout");
                return ReconciliationOutcome::Skipped(SkipReason::Storage);
            }
        };
        if trial_started {
            info!(%user_id, "trial activated from checkout");
        }

        let upsert = SubscriptionUpsert {
            user_id,
            contact_email,
            external_customer_ref: customer_ref.clone(),
            external_subscription_ref: subscription_ref.clone(),
            plan: items.plan,
            status: ACTIVE_STATUS.to_string(),
            licensed_line_item_ref: items.licensed_line_item_ref,
            metered_line_item_ref: items.metered_line_item_ref,
        };
        match self.stores.subscriptions.upsert_subscription(&upsert).await {
            Ok(subscription) => {
                info!(
                    %user_id,
                    %customer_ref,
                    %subscription_ref,
                    plan = %subscription.plan,
                    "subscription saved"
                );
                ReconciliationOutcome::Applied {
                    subscription,
                    trial_started,
                }
            }
            Err(err) => {
                error!(?err, %customer_ref, %subscription_ref, "failed to upsert subscription");
                ReconciliationOutcome::Skipped(SkipReason::Storage)
            }
        }
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

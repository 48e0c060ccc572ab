pub mod adapters;
pub mod models;
pub mod reconciliation;
pub mod signature;
pub mod store;
pub mod usage;

pub use adapters::{BillingProvider, StripeClient};
pub use models::{
    ClassifiedLineItems, LineItemKind, PriceCatalog, ProviderLineItem, ProviderSubscription,
    Subscription, SubscriptionUpsert, ACTIVE_STATUS,
};
pub use reconciliation::{
    ReconciliationOutcome, SkipReason, SubscriptionReconciler, WebhookEvent, WebhookEventData,
};
pub use signature::{sign_payload, verify_signature, WebhookConfig, WebhookError, SIGNATURE_HEADER};
pub use store::SubscriptionStore;
pub use usage::{MeteredUsageReporter, UsageReporter};

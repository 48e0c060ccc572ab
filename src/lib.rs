pub mod accounts;
pub mod alerts;
pub mod auth;
pub mod billing;
pub mod config;
pub mod contacts;
pub mod db;
pub mod entitlements;
pub mod error;
pub mod extractor;
pub mod notifications;
pub mod routes;
pub mod webhooks;

use std::sync::Arc;

use axum::{Extension, Router};

use crate::accounts::AccountService;
use crate::alerts::{AlertDispatcher, PublicSite};
use crate::billing::{BillingProvider, PriceCatalog, SubscriptionReconciler, UsageReporter, WebhookConfig};
use crate::contacts::ContactRegistry;
use crate::db::Stores;
use crate::notifications::{BulkSmsSender, NotificationSender};

/// Collaborators wired once at startup and shared by every request.
#[derive(Clone)]
pub struct AppServices {
    pub stores: Stores,
    pub accounts: AccountService,
    pub contacts: ContactRegistry,
    pub dispatcher: AlertDispatcher,
    pub reconciler: SubscriptionReconciler,
    pub webhook_config: WebhookConfig,
    pub public_site: PublicSite,
}

pub struct Collaborators {
    pub notifier: Arc<dyn NotificationSender>,
    pub bulk_sms: Arc<dyn BulkSmsSender>,
    pub usage: Arc<dyn UsageReporter>,
    pub billing: Arc<dyn BillingProvider>,
}

impl AppServices {
    pub fn new(
        stores: Stores,
        collaborators: Collaborators,
        catalog: PriceCatalog,
        webhook_config: WebhookConfig,
        public_site: PublicSite,
    ) -> Self {
        Self {
            accounts: AccountService::new(stores.clone()),
            contacts: ContactRegistry::new(stores.clone()),
            dispatcher: AlertDispatcher::new(
                stores.clone(),
                collaborators.notifier,
                collaborators.bulk_sms,
                collaborators.usage,
            ),
            reconciler: SubscriptionReconciler::new(stores.clone(), collaborators.billing, catalog),
            stores,
            webhook_config,
            public_site,
        }
    }
}

/// API router with every service extension attached. The database pool used
/// by registration and login is layered on by the binary.
pub fn app(services: AppServices) -> Router {
    routes::api_routes()
        .layer(Extension(services.stores))
        .layer(Extension(services.accounts))
        .layer(Extension(services.contacts))
        .layer(Extension(services.dispatcher))
        .layer(Extension(services.reconciler))
        .layer(Extension(services.webhook_config))
        .layer(Extension(services.public_site))
}

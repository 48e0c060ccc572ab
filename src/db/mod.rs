//! Postgres persistence and the store bundle shared by the services.

mod accounts;
mod alerts;
mod contacts;
mod profiles;
mod subscriptions;

use std::sync::Arc;

use sqlx::PgPool;

use crate::accounts::{Profile, ProfileStore};
use crate::alerts::AlertStore;
use crate::billing::SubscriptionStore;
use crate::contacts::ContactStore;
use crate::entitlements::{EntitlementSnapshot, Plan};

pub use accounts::{
    create_account_with_profile, delete_account, find_credentials, find_user, Credentials,
};

/// key: store-bundle -> one handle per persistence seam
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub alerts: Arc<dyn AlertStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    /// Uses one backing store for every seam.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ProfileStore + SubscriptionStore + ContactStore + AlertStore + 'static,
    {
        Self {
            profiles: store.clone(),
            subscriptions: store.clone(),
            contacts: store.clone(),
            alerts: store,
        }
    }

    pub async fn snapshot_for_user(
        &self,
        user_id: i32,
    ) -> sqlx::Result<Option<EntitlementSnapshot>> {
        match self.profiles.profile_for_user(user_id).await? {
            Some(profile) => Ok(Some(self.snapshot_for_profile(profile).await?)),
            None => Ok(None),
        }
    }

    pub async fn snapshot_for_profile(&self, profile: Profile) -> sqlx::Result<EntitlementSnapshot> {
        let subscription = self
            .subscriptions
            .active_subscription(profile.user_id)
            .await?;
        Ok(EntitlementSnapshot::new(profile, subscription))
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_plan(value: &str) -> sqlx::Result<Plan> {
    value
        .parse::<Plan>()
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use super::models::Profile;
use super::store::ProfileStore;
use crate::db::Stores;
use crate::entitlements::{self, EntitlementSnapshot, EntitlementSummary, TrialError};

/// Attempts made before an optimistic profile write gives up.
pub const MAX_PROFILE_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("profile not found")]
    ProfileNotFound,
    #[error(transparent)]
    Trial(#[from] TrialError),
    #[error("profile was modified concurrently, try again")]
    Conflict,
}

#[derive(Debug, Error)]
pub enum ProfileMutationError<E> {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("profile not found")]
    NotFound,
    #[error("profile version conflict")]
    Conflict,
    #[error("profile change rejected")]
    Rejected(E),
}

/// Loads the profile, applies `apply` and writes it back guarded by the
/// profile version, reloading and reapplying on a version conflict.
pub async fn mutate_profile<T, E, F>(
    store: &dyn ProfileStore,
    user_id: i32,
    mut apply: F,
) -> Result<(Profile, T), ProfileMutationError<E>>
where
    F: FnMut(&mut Profile) -> Result<T, E> + Send,
    T: Send,
    E: Send,
{
    for attempt in 1..=MAX_PROFILE_WRITE_ATTEMPTS {
        let mut profile = store
            .profile_for_user(user_id)
            .await?
            .ok_or(ProfileMutationError::NotFound)?;
        let value = apply(&mut profile).map_err(ProfileMutationError::Rejected)?;
        if store.update_profile(&profile).await? {
            profile.version += 1;
            return Ok((profile, value));
        }
        warn!(%user_id, attempt, "profile version conflict, reloading");
    }
    Err(ProfileMutationError::Conflict)
}

/// key: account-service -> trial requests, entitlement summaries
#[derive(Clone)]
pub struct AccountService {
    stores: Stores,
}

impl AccountService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn request_trial(&self, user_id: i32) -> Result<Profile, AccountError> {
        let now = Utc::now();
        let (profile, ()) = mutate_profile(self.stores.profiles.as_ref(), user_id, |profile| {
            entitlements::start_trial(profile, now)
        })
        .await
        .map_err(|err| match err {
            ProfileMutationError::Database(err) => AccountError::Database(err),
            ProfileMutationError::NotFound => AccountError::ProfileNotFound,
            ProfileMutationError::Conflict => AccountError::Conflict,
            ProfileMutationError::Rejected(err) => AccountError::Trial(err),
        })?;
        info!(%user_id, trial_started_at = ?profile.trial_started_at, "trial started");
        Ok(profile)
    }

    pub async fn entitlement_summary(
        &self,
        user_id: i32,
    ) -> Result<EntitlementSummary, AccountError> {
        let snapshot = self.snapshot(user_id).await?;
        Ok(snapshot.summary(Utc::now()))
    }

    pub async fn snapshot(&self, user_id: i32) -> Result<EntitlementSnapshot, AccountError> {
        self.stores
            .snapshot_for_user(user_id)
            .await?
            .ok_or(AccountError::ProfileNotFound)
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use super::models::Profile;

/// key: profile-store -> persistence seam for profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile_for_user(&self, user_id: i32) -> sqlx::Result<Option<Profile>>;

    async fn profile_by_token(&self, token: Uuid) -> sqlx::Result<Option<Profile>>;

    async fn profile_by_customer_ref(&self, customer_ref: &str) -> sqlx::Result<Option<Profile>>;

    /// Writes the mutable profile fields if the stored version still equals
    /// `profile.version`, bumping it. Returns `false` on a version mismatch.
    async fn update_profile(&self, profile: &Profile) -> sqlx::Result<bool>;
}

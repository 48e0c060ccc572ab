use async_trait::async_trait;

use super::models::{Contact, NewContact};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactInsertOutcome {
    Inserted(Contact),
    Duplicate,
    LimitReached { existing: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactUpdateOutcome {
    Updated(Contact),
    NotFound,
    Duplicate,
}

/// key: contact-store -> owner scoped contact persistence
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list_contacts(&self, user_id: i32) -> sqlx::Result<Vec<Contact>>;

    async fn count_contacts(&self, user_id: i32) -> sqlx::Result<i64>;

    /// Counts and inserts as one step per owner: concurrent inserts for the
    /// same owner never push the count past `limit`.
    async fn insert_within_limit(
        &self,
        user_id: i32,
        contact: &NewContact,
        limit: u32,
    ) -> sqlx::Result<ContactInsertOutcome>;

    /// `contact` holds the fully merged values to store.
    async fn update_contact(
        &self,
        user_id: i32,
        contact_id: i64,
        contact: &NewContact,
    ) -> sqlx::Result<ContactUpdateOutcome>;

    async fn delete_contact(&self, user_id: i32, contact_id: i64) -> sqlx::Result<bool>;
}

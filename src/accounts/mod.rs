//! Accounts, profiles and trial activation.

pub mod api;
pub mod models;
pub mod service;
pub mod store;

pub use api::routes;
pub use models::{Profile, UserAccount};
pub use service::{mutate_profile, AccountError, AccountService, ProfileMutationError};
pub use store::ProfileStore;

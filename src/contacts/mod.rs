//! Emergency contacts and their per-plan ceilings.

pub mod api;
pub mod models;
pub mod phone;
pub mod service;
pub mod store;

pub use api::routes;
pub use models::{Contact, ContactUpdate, NewContact};
pub use phone::{normalize_e164, validate_phone};
pub use service::{ContactError, ContactRegistry};
pub use store::{ContactInsertOutcome, ContactStore, ContactUpdateOutcome};

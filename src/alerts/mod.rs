//! Alert triggering, capability token access and delivery.

pub mod api;
pub mod dispatcher;
pub mod manifest;
pub mod models;
pub mod store;

pub use api::routes;
pub use dispatcher::{format_message, AlertDispatcher, AlertError, DEFAULT_ALERT_MESSAGE};
pub use manifest::PublicSite;
pub use models::{
    AlertRequest, AlertSummary, EmergencyAlert, NewAlert, PublicAlertOutcome, PublicAlertRequest,
    ReadinessReport,
};
pub use store::AlertStore;

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::models::{
    AlertRequest, AlertSummary, NewAlert, PublicAlertOutcome, PublicAlertRequest,
    ReadinessReport,
};
use crate::accounts::Profile;
use crate::billing::UsageReporter;
use crate::contacts::Contact;
use crate::db::Stores;
use crate::entitlements::Plan;
use crate::notifications::{BulkSmsSender, NotificationSender};

pub const DEFAULT_ALERT_MESSAGE: &str = "🚨 Emergency alert!";
pub const READINESS_OK: &str = "Test successful. Ready to trigger alert.";
pub const READINESS_NO_ACCESS: &str = "Account inactive or no subscription.";
pub const READINESS_NO_CONTACTS: &str = "No emergency contacts configured.";

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid alert token")]
    InvalidToken,
    #[error("profile not found")]
    ProfileNotFound,
    #[error("your plan does not include emergency alerts")]
    PlanInactive,
    #[error("an active subscription is required to send alerts")]
    SubscriptionRequired,
    #[error("{0}")]
    AccessForbidden(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AlertError {
    pub fn code(&self) -> &'static str {
        match self {
            AlertError::InvalidToken => "invalid_token",
            AlertError::ProfileNotFound => "profile_not_found",
            AlertError::PlanInactive => "plan_inactive",
            AlertError::SubscriptionRequired => "subscription_required",
            AlertError::AccessForbidden(_) => "access_forbidden",
            AlertError::Database(_) => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Delivery {
    successful: u32,
    failed: u32,
}

/// key: alert-dispatcher -> persist, fan out, bill
///
/// Delivery and billing failures are logged and counted, never returned.
#[derive(Clone)]
pub struct AlertDispatcher {
    stores: Stores,
    notifier: Arc<dyn NotificationSender>,
    bulk_sms: Arc<dyn BulkSmsSender>,
    usage: Arc<dyn UsageReporter>,
}

impl AlertDispatcher {
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn NotificationSender>,
        bulk_sms: Arc<dyn BulkSmsSender>,
        usage: Arc<dyn UsageReporter>,
    ) -> Self {
        Self {
            stores,
            notifier,
            bulk_sms,
            usage,
        }
    }

    /// Alert triggered by a signed-in user.
    pub async fn trigger_alert(
        &self,
        user_id: i32,
        request: AlertRequest,
    ) -> Result<AlertSummary, AlertError> {
        let now = Utc::now();
        let snapshot = self
            .stores
            .snapshot_for_user(user_id)
            .await?
            .ok_or(AlertError::ProfileNotFound)?;
        if !snapshot.has_premium_access(now) {
            return Err(AlertError::PlanInactive);
        }
        let plan = snapshot.plan(now);
        let location = shareable_location(request.location, plan);

        let alert = self
            .stores
            .alerts
            .insert_alert(&NewAlert {
                user_id,
                message: Some(alert_message(request.message)),
                location: location.clone(),
                is_test: request.is_test,
            })
            .await?;
        info!(%user_id, alert_id = alert.id, is_test = alert.is_test, "alert recorded");

        let contacts = self.stores.contacts.list_contacts(user_id).await?;
        let text = format_message(alert.message.as_deref(), location.as_deref());
        let delivery = self.notify_contacts(user_id, &contacts, &text).await;

        let billing_skipped = request.is_test || delivery.successful == 0;
        if !billing_skipped {
            self.report_usage(user_id, delivery.successful).await;
        }

        Ok(AlertSummary {
            alert_id: alert.id,
            contacts_count: contacts.len(),
            successful_sends: delivery.successful,
            failed_sends: delivery.failed,
            location_shared: location.is_some(),
            plan,
            billing_skipped,
        })
    }

    /// Alert triggered through the capability token, without a session.
    pub async fn trigger_public_alert(
        &self,
        token: &str,
        request: PublicAlertRequest,
    ) -> Result<PublicAlertOutcome, AlertError> {
        let profile = self.resolve_token(token).await?;
        let user_id = profile.user_id;

        if request.continuous {
            info!(
                %user_id,
                location = ?request.location,
                "location heartbeat received"
            );
            return Ok(PublicAlertOutcome::Heartbeat {
                location_received: request.location.is_some(),
            });
        }

        let now = Utc::now();
        let snapshot = self.stores.snapshot_for_profile(profile).await?;
        if !snapshot.has_premium_access(now) {
            return Err(AlertError::SubscriptionRequired);
        }
        let plan = snapshot.plan(now);
        let location = shareable_location(request.location, plan);

        let alert = self
            .stores
            .alerts
            .insert_alert(&NewAlert {
                user_id,
                message: Some(alert_message(request.message)),
                location: location.clone(),
                is_test: request.is_test,
            })
            .await?;
        let prior_real_alerts = self
            .stores
            .alerts
            .count_real_alerts_excluding(user_id, alert.id)
            .await?;
        let is_first_real_alert = !request.is_test && prior_real_alerts == 0;
        info!(
            %user_id,
            alert_id = alert.id,
            is_test = request.is_test,
            is_first_real_alert,
            "public alert recorded"
        );

        let contacts = self.stores.contacts.list_contacts(user_id).await?;
        let mut delivery = Delivery::default();
        if !request.is_test {
            let text = format_message(alert.message.as_deref(), location.as_deref());
            let (per_contact, bulk) = tokio::join!(
                self.notify_contacts(user_id, &contacts, &text),
                self.bulk_sms.send_to_all(user_id, &contacts, &text),
            );
            delivery = per_contact;
            match bulk {
                Ok(report) => info!(
                    %user_id,
                    sent = report.sent,
                    skipped = report.skipped,
                    failed = report.failed,
                    "bulk sms finished"
                ),
                Err(err) => error!(%user_id, ?err, "bulk sms failed"),
            }
        }

        let billing_skipped = request.is_test || is_first_real_alert;
        if !billing_skipped && delivery.successful > 0 {
            self.report_usage(user_id, delivery.successful).await;
        }

        Ok(PublicAlertOutcome::Dispatched(AlertSummary {
            alert_id: alert.id,
            contacts_count: contacts.len(),
            successful_sends: delivery.successful,
            failed_sends: delivery.failed,
            location_shared: location.is_some(),
            plan,
            billing_skipped,
        }))
    }

    pub async fn check_public_alert_readiness(
        &self,
        token: &str,
    ) -> Result<ReadinessReport, AlertError> {
        let profile = self.resolve_token(token).await?;
        let user_id = profile.user_id;
        let now = Utc::now();
        let snapshot = self.stores.snapshot_for_profile(profile).await?;
        if !snapshot.has_premium_access(now) {
            return Err(AlertError::AccessForbidden(READINESS_NO_ACCESS.to_string()));
        }
        let contact_count = self.stores.contacts.count_contacts(user_id).await?;
        if contact_count == 0 {
            return Err(AlertError::AccessForbidden(READINESS_NO_CONTACTS.to_string()));
        }
        Ok(ReadinessReport {
            plan: snapshot.plan(now),
            contact_count,
            message: READINESS_OK.to_string(),
        })
    }

    /// Malformed tokens and unknown tokens are reported differently.
    pub async fn resolve_token(&self, token: &str) -> Result<Profile, AlertError> {
        let token = Uuid::parse_str(token.trim()).map_err(|_| AlertError::InvalidToken)?;
        self.stores
            .profiles
            .profile_by_token(token)
            .await?
            .ok_or(AlertError::ProfileNotFound)
    }

    async fn notify_contacts(&self, user_id: i32, contacts: &[Contact], message: &str) -> Delivery {
        let results = join_all(
            contacts
                .iter()
                .map(|contact| self.notifier.send(contact, user_id, message)),
        )
        .await;

        let mut delivery = Delivery::default();
        for (contact, result) in contacts.iter().zip(results) {
            match result {
                Ok(()) => delivery.successful += 1,
                Err(err) => {
                    warn!(%user_id, contact_id = contact.id, ?err, "notification failed");
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    async fn report_usage(&self, user_id: i32, quantity: u32) {
        if let Err(err) = self.usage.report_usage(user_id, quantity).await {
            error!(%user_id, quantity, ?err, "failed to report metered usage");
        }
    }
}

fn alert_message(message: Option<String>) -> String {
    message
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_ALERT_MESSAGE.to_string())
}

/// Location is only kept for the premium plan.
fn shareable_location(location: Option<String>, plan: Plan) -> Option<String> {
    location
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty() && plan == Plan::Premium)
}

pub fn format_message(message: Option<&str>, location: Option<&str>) -> String {
    let message = message.unwrap_or(DEFAULT_ALERT_MESSAGE);
    match location {
        Some(location) => format!("{message}\n\nLocation: {location}"),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_appended_to_message() {
        assert_eq!(
            format_message(Some("Help"), Some("51.5,-0.1")),
            "Help\n\nLocation: 51.5,-0.1"
        );
        assert_eq!(format_message(None, None), DEFAULT_ALERT_MESSAGE);
    }

    #[test]
    fn location_dropped_below_premium() {
        assert_eq!(shareable_location(Some("home".into()), Plan::Basic), None);
        assert_eq!(
            shareable_location(Some(" home ".into()), Plan::Premium),
            Some("home".into())
        );
        assert_eq!(shareable_location(Some("  ".into()), Plan::Premium), None);
    }

    #[test]
    fn blank_message_falls_back_to_default() {
        assert_eq!(alert_message(Some("   ".into())), DEFAULT_ALERT_MESSAGE);
        assert_eq!(alert_message(Some("Fall detected".into())), "Fall detected");
    }
}

//! Outbound alert delivery seams.

pub mod twilio;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::contacts::{normalize_e164, Contact};

pub use twilio::{TwilioConfig, TwilioSmsSender};

/// key: notification-sender -> one message to one contact
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, contact: &Contact, from_user_id: i32, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSmsReport {
    pub sent: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// key: bulk-sms -> best effort SMS to every contact of a user
#[async_trait]
pub trait BulkSmsSender: Send + Sync {
    async fn send_to_all(
        &self,
        user_id: i32,
        contacts: &[Contact],
        message: &str,
    ) -> Result<BulkSmsReport>;
}

/// Records deliveries in the log only. Used when no SMS gateway is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, contact: &Contact, from_user_id: i32, message: &str) -> Result<()> {
        info!(
            %from_user_id,
            contact_id = contact.id,
            phone = %contact.phone_number,
            message,
            "emergency notification"
        );
        Ok(())
    }
}

#[async_trait]
impl BulkSmsSender for LogNotificationSender {
    async fn send_to_all(
        &self,
        user_id: i32,
        contacts: &[Contact],
        message: &str,
    ) -> Result<BulkSmsReport> {
        let mut report = BulkSmsReport::default();
        for contact in contacts {
            match normalize_e164(&contact.phone_number) {
                Some(to) => {
                    info!(%user_id, %to, message, "bulk sms (log only)");
                    report.sent += 1;
                }
                None => report.skipped += 1,
            }
        }
        Ok(report)
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{info, warn};

use super::{BulkSmsReport, BulkSmsSender};
use crate::contacts::{normalize_e164, Contact};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// key: sms-adapter-twilio -> REST client, built once at startup
#[derive(Clone)]
pub struct TwilioSmsSender {
    client: reqwest::Client,
    config: TwilioConfig,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
}

impl TwilioSmsSender {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build sms gateway client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<String> {
        let url = self.endpoint(&format!(
            "2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        ));
        let form = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];
        let message: TwilioMessage = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .context("failed to contact sms gateway")?
            .error_for_status()
            .context("sms gateway rejected message")?
            .json()
            .await
            .context("failed to decode sms gateway response")?;
        Ok(message.sid)
    }
}

#[async_trait]
impl BulkSmsSender for TwilioSmsSender {
    async fn send_to_all(
        &self,
        user_id: i32,
        contacts: &[Contact],
        message: &str,
    ) -> Result<BulkSmsReport> {
        let mut report = BulkSmsReport::default();
        let mut recipients = Vec::with_capacity(contacts.len());
        for contact in contacts {
            match normalize_e164(&contact.phone_number) {
                Some(to) => recipients.push((contact.id, to)),
                None => {
                    warn!(%user_id, contact_id = contact.id, "skipping contact with unusable phone number");
                    report.skipped += 1;
                }
            }
        }

        let results = join_all(
            recipients
                .iter()
                .map(|(_, to)| self.send_sms(to.as_str(), message)),
        )
        .await;
        for ((contact_id, _), result) in recipients.iter().zip(results) {
            match result {
                Ok(sid) => {
                    info!(%user_id, contact_id, %sid, "sms sent");
                    report.sent += 1;
                }
                Err(err) => {
                    warn!(%user_id, contact_id, ?err, "sms send failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

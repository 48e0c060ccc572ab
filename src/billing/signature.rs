use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signing secret is not configured")]
    MissingSecret,
    #[error("webhook signature verification failed")]
    InvalidSignature,
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSecret => "webhook_not_configured",
            WebhookError::InvalidSignature => "invalid_signature",
            WebhookError::MalformedEvent(_) => "malformed_event",
        }
    }
}

/// key: webhook-config -> signing secret and replay window
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub signing_secret: Option<String>,
    pub tolerance: Duration,
}

/// Checks a `t=<unix>,v1=<hex>` signature header against
/// HMAC-SHA256(`"<t>.<payload>"`). Any one matching `v1` entry is enough.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let mut pair = part.trim().splitn(2, '=');
        match (pair.next(), pair.next()) {
            (Some("t"), Some(value)) => timestamp = Some(value),
            (Some("v1"), Some(value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidSignature)?;
    let skew = now
        .timestamp()
        .checked_sub(issued_at)
        .map(i64::unsigned_abs)
        .ok_or(WebhookError::InvalidSignature)?;
    if skew > tolerance.num_seconds().unsigned_abs() {
        return Err(WebhookError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let verified = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if verified {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

/// Builds a header value the way the provider does. Used by tests and local
/// tooling that replays events.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={signature}"))
}

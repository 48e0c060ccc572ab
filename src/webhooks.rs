use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use tracing::{info, warn};

use crate::billing::{
    verify_signature, SubscriptionReconciler, WebhookConfig, WebhookError, WebhookEvent,
    SIGNATURE_HEADER,
};
use crate::error::AppResult;

/// key: webhooks-billing -> signed provider entrypoint
///
/// Only authentication problems are reported to the sender. Once the
/// signature checks out the event is acknowledged whatever happens next.
pub async fn billing_webhook(
    Extension(reconciler): Extension<SubscriptionReconciler>,
    Extension(config): Extension<WebhookConfig>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let secret = config
        .signing_secret
        .as_deref()
        .ok_or(WebhookError::MissingSecret)?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::InvalidSignature)?;
    if let Err(err) = verify_signature(&body, signature, secret, config.tolerance, Utc::now()) {
        warn!("billing webhook signature rejected");
        return Err(err.into());
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(?err, "billing webhook payload could not be decoded");
            return Err(WebhookError::MalformedEvent(err.to_string()).into());
        }
    };

    let outcome = reconciler.handle_event(&event).await;
    info!(kind = %event.kind, ?outcome, "billing webhook processed");
    Ok(StatusCode::OK)
}

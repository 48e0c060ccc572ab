use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::accounts::AccountError;
use crate::alerts::AlertError;
use crate::billing::WebhookError;
use crate::contacts::ContactError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error(transparent)]
    Alert(#[from] AlertError),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Message(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Account(err) => match err {
                AccountError::ProfileNotFound => StatusCode::NOT_FOUND,
                AccountError::Trial(_) => StatusCode::BAD_REQUEST,
                AccountError::Conflict => StatusCode::CONFLICT,
                AccountError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Contact(err) => match err {
                ContactError::InvalidPhoneFormat
                | ContactError::InvalidName
                | ContactError::DuplicateContact
                | ContactError::ContactLimitReached { .. } => StatusCode::BAD_REQUEST,
                ContactError::NotFound | ContactError::ProfileNotFound => StatusCode::NOT_FOUND,
                ContactError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Alert(err) => match err {
                AlertError::InvalidToken => StatusCode::BAD_REQUEST,
                AlertError::ProfileNotFound => StatusCode::NOT_FOUND,
                AlertError::PlanInactive
                | AlertError::SubscriptionRequired
                | AlertError::AccessForbidden(_) => StatusCode::FORBIDDEN,
                AlertError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Webhook(err) => match err {
                WebhookError::InvalidSignature | WebhookError::MalformedEvent(_) => {
                    StatusCode::BAD_REQUEST
                }
                WebhookError::MissingSecret => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Db(_) | AppError::Message(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::Account(AccountError::Trial(err)) => err.code(),
            AppError::Account(AccountError::ProfileNotFound) => "profile_not_found",
            AppError::Account(AccountError::Conflict) => "conflict",
            AppError::Contact(err) => err.code(),
            AppError::Alert(err) => err.code(),
            AppError::Webhook(err) => err.code(),
            AppError::Db(_) | AppError::Message(_) | AppError::Account(AccountError::Database(_)) => {
                "internal_error"
            }
        }
    }

    fn body(&self, status: StatusCode) -> Value {
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let mut body = Map::new();
        body.insert("error".into(), json!(self.code()));
        body.insert("message".into(), json!(message));
        if let AppError::Contact(ContactError::ContactLimitReached { limit, plan }) = self {
            body.insert("limit".into(), json!(limit));
            body.insert("plan".into(), json!(plan));
        }
        Value::Object(body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(?self);
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(self.body(status))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlements::Plan;

    #[test]
    fn contact_limit_body_carries_structured_fields() {
        let err = AppError::from(ContactError::ContactLimitReached {
            limit: 3,
            plan: Plan::Basic,
        });
        let status = err.status();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = err.body(status);
        assert_eq!(body["error"], "contact_limit_reached");
        assert_eq!(body["limit"], 3);
        assert_eq!(body["plan"], "basic");
    }

    #[test]
    fn malformed_token_and_missing_profile_differ() {
        assert_eq!(
            AppError::from(AlertError::InvalidToken).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AlertError::ProfileNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::Message("stripe key leaked".into());
        let status = err.status();
        let body = err.body(status);
        assert_eq!(body["message"], "internal server error");
    }
}

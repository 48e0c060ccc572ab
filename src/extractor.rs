use axum::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub exp: usize,
}

/// Authenticated account, resolved from the `auth_token` cookie or a bearer
/// token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i32,
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    let from_cookie = parts
        .headers
        .get(axum::http::header::COOKIE)
        .and_then(|header| header.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                cookie
                    .trim()
                    .strip_prefix(AUTH_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                    .map(str::to_string)
            })
        });
    from_cookie.or_else(|| {
        parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token =
            token_from_parts(parts).ok_or((StatusCode::UNAUTHORIZED, "Missing token".into()))?;
        let secret = crate::config::JWT_SECRET.as_deref().ok_or_else(|| {
            tracing::error!("JWT_SECRET is not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication unavailable".to_string(),
            )
        })?;
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid token".into()))?;
        Ok(AuthUser {
            user_id: decoded.claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn signed(sub: i32) -> String {
        let claims = Claims {
            sub,
            exp: 9_999_999_999,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn token_parsed_from_bearer_header() {
        std::env::set_var("JWT_SECRET", "secret");
        let request = Request::builder()
            .header("Authorization", format!("Bearer {}", signed(7)))
            .body(axum::body::Body::empty())
            .unwrap();
        let mut parts = request.into_parts().0;
        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_id, 7);
    }

    #[tokio::test]
    async fn token_parsed_from_cookie() {
        std::env::set_var("JWT_SECRET", "secret");
        let request = Request::builder()
            .header("Cookie", format!("theme=dark; auth_token={}", signed(11)))
            .body(axum::body::Body::empty())
            .unwrap();
        let mut parts = request.into_parts().0;
        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_id, 11);
    }

    #[tokio::test]
    async fn invalid_token_rejected() {
        std::env::set_var("JWT_SECRET", "secret");
        let request = Request::builder()
            .header("Authorization", "Bearer invalid")
            .body(axum::body::Body::empty())
            .unwrap();
        let mut parts = request.into_parts().0;
        let res = AuthUser::from_request_parts(&mut parts, &()).await;
        assert_eq!(res.unwrap_err().0, StatusCode::UNAUTHORIZED);
    }
}

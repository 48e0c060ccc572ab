use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{self, Stores};
use crate::error::{AppError, AppResult};
use crate::extractor::{AuthUser, Claims, AUTH_COOKIE};

const SESSION_HOURS: i64 = 24;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisteredUser {
    pub id: i32,
    pub email: String,
}

#[derive(Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub email: String,
    pub public_token: Uuid,
}

pub async fn register_user(
    Extension(pool): Extension<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisteredUser>)> {
    let email = payload.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::BadRequest("Password too short".into()));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Message(format!("Hashing failed: {}", e)))?;

    match db::create_account_with_profile(&pool, &email, &hash.to_string()).await {
        Ok((account, _profile)) => {
            info!(user_id = account.id, "account registered");
            Ok((
                StatusCode::CREATED,
                Json(RegisteredUser {
                    id: account.id,
                    email: account.email,
                }),
            ))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("users_email_key") {
                    return Err(AppError::BadRequest("Email already registered".into()));
                }
            }
            Err(AppError::Db(e))
        }
    }
}

pub async fn login_user(
    Extension(pool): Extension<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, &'static str)> {
    let email = payload.email.trim().to_ascii_lowercase();
    let credentials = db::find_credentials(&pool, &email)
        .await
        .map_err(|e| {
            error!(?e, "DB error while fetching user");
            AppError::Db(e)
        })?
        .ok_or(AppError::Unauthorized)?;
    let parsed = PasswordHash::new(&credentials.password_hash).map_err(|e| {
        error!(?e, "Hash parse error");
        AppError::Message(format!("Hash error: {}", e))
    })?;
    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(AppError::Unauthorized);
    }

    let exp = (Utc::now() + Duration::hours(SESSION_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: credentials.user_id,
        exp,
    };
    let secret = crate::config::JWT_SECRET
        .as_deref()
        .ok_or_else(|| AppError::Message("JWT_SECRET is not configured".into()))?;
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(?e, "Token encoding error");
        AppError::Message("Token error".into())
    })?;

    let cookie = HeaderValue::from_str(&format!(
        "{AUTH_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Path=/"
    ))
    .map_err(|e| AppError::Message(format!("Cookie error: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(axum::http::header::SET_COOKIE, cookie);
    Ok((headers, "Login successful"))
}

pub async fn current_user(
    Extension(pool): Extension<PgPool>,
    Extension(stores): Extension<Stores>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<UserInfo>> {
    let account = db::find_user(&pool, user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let profile = stores
        .profiles
        .profile_for_user(user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(UserInfo {
        id: account.id,
        email: account.email,
        public_token: profile.public_token,
    }))
}

pub async fn delete_account(
    AuthUser { user_id }: AuthUser,
    Extension(pool): Extension<PgPool>,
) -> AppResult<StatusCode> {
    if !db::delete_account(&pool, user_id).await? {
        return Err(AppError::NotFound);
    }
    info!(%user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

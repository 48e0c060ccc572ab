use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::accounts::{Profile, UserAccount};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: i32,
    pub password_hash: String,
}

/// Creates the account and its profile in one transaction.
pub async fn create_account_with_profile(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<(UserAccount, Profile), sqlx::Error> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email, created_at
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut tx)
    .await?;
    let account = UserAccount {
        id: row.get("id"),
        email: row.get("email"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    };

    let profile = Profile::new(account.id);
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, plan_tier, public_token)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(profile.user_id)
    .bind(profile.plan_tier.as_str())
    .bind(profile.public_token)
    .execute(&mut tx)
    .await?;

    tx.commit().await?;
    Ok((account, profile))
}

pub async fn find_credentials(pool: &PgPool, email: &str) -> Result<Option<Credentials>, sqlx::Error> {
    let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| Credentials {
        user_id: row.get("id"),
        password_hash: row.get("password_hash"),
    }))
}

pub async fn find_user(pool: &PgPool, user_id: i32) -> Result<Option<UserAccount>, sqlx::Error> {
    let row = sqlx::query("SELECT id, email, created_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| UserAccount {
        id: row.get("id"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }))
}

/// Deletes the account. Profile, contacts and alerts go with it; subscriptions
/// are kept with their owner cleared.
pub async fn delete_account(pool: &PgPool, user_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Row};

use super::PgStore;
use crate::contacts::{
    Contact, ContactInsertOutcome, ContactStore, ContactUpdateOutcome, NewContact,
};

const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self, user_id: i32) -> sqlx::Result<Vec<Contact>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, phone_number, relationship
            FROM contacts
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_row).collect())
    }

    async fn count_contacts(&self, user_id: i32) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_within_limit(
        &self,
        user_id: i32,
        contact: &NewContact,
        limit: u32,
    ) -> sqlx::Result<ContactInsertOutcome> {
        let mut tx = self.pool.begin().await?;

        // Serializes contact creation per owner.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut tx)
            .await?;

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM contacts WHERE user_id = $1 AND phone_number = $2)",
        )
        .bind(user_id)
        .bind(&contact.phone_number)
        .fetch_one(&mut tx)
        .await?;
        if duplicate {
            return Ok(ContactInsertOutcome::Duplicate);
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut tx)
            .await?;
        if existing >= i64::from(limit) {
            return Ok(ContactInsertOutcome::LimitReached { existing });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO contacts (user_id, name, phone_number, relationship)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, phone_number, relationship
            "#,
        )
        .bind(user_id)
        .bind(&contact.name)
        .bind(&contact.phone_number)
        .bind(contact.relationship.as_deref())
        .fetch_one(&mut tx)
        .await;
        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => return Ok(ContactInsertOutcome::Duplicate),
            Err(err) => return Err(err),
        };

        tx.commit().await?;
        Ok(ContactInsertOutcome::Inserted(map_row(&row)))
    }

    async fn update_contact(
        &self,
        user_id: i32,
        contact_id: i64,
        contact: &NewContact,
    ) -> sqlx::Result<ContactUpdateOutcome> {
        let updated = sqlx::query(
            r#"
            UPDATE contacts
            SET name = $3, phone_number = $4, relationship = $5
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, phone_number, relationship
            "#,
        )
        .bind(contact_id)
        .bind(user_id)
        .bind(&contact.name)
        .bind(&contact.phone_number)
        .bind(contact.relationship.as_deref())
        .fetch_optional(&self.pool)
        .await;
        match updated {
            Ok(Some(row)) => Ok(ContactUpdateOutcome::Updated(map_row(&row))),
            Ok(None) => Ok(ContactUpdateOutcome::NotFound),
            Err(err) if is_unique_violation(&err) => Ok(ContactUpdateOutcome::Duplicate),
            Err(err) => Err(err),
        }
    }

    async fn delete_contact(&self, user_id: i32, contact_id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND user_id = $2")
            .bind(contact_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_row(row: &PgRow) -> Contact {
    Contact {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        phone_number: row.get("phone_number"),
        relationship: row.get("relationship"),
    }
}

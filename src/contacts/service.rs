use chrono::Utc;
use thiserror::Error;
use tracing::info;

use super::models::{Contact, ContactUpdate, NewContact};
use super::phone::validate_phone;
use super::store::{ContactInsertOutcome, ContactUpdateOutcome};
use crate::db::Stores;
use crate::entitlements::Plan;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("phone number must start with + followed by at least 9 digits")]
    InvalidPhoneFormat,
    #[error("contact name must not be empty")]
    InvalidName,
    #[error("a contact with this phone number already exists")]
    DuplicateContact,
    #[error("contact limit of {limit} reached for the {plan} plan")]
    ContactLimitReached { limit: u32, plan: Plan },
    #[error("contact not found")]
    NotFound,
    #[error("profile not found")]
    ProfileNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ContactError {
    pub fn code(&self) -> &'static str {
        match self {
            ContactError::InvalidPhoneFormat => "invalid_phone_format",
            ContactError::InvalidName => "invalid_name",
            ContactError::DuplicateContact => "duplicate_contact",
            ContactError::ContactLimitReached { .. } => "contact_limit_reached",
            ContactError::NotFound => "contact_not_found",
            ContactError::ProfileNotFound => "profile_not_found",
            ContactError::Database(_) => "internal_error",
        }
    }
}

/// key: contact-registry -> plan bounded emergency contacts
#[derive(Clone)]
pub struct ContactRegistry {
    stores: Stores,
}

impl ContactRegistry {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn list_contacts(&self, user_id: i32) -> Result<Vec<Contact>, ContactError> {
        Ok(self.stores.contacts.list_contacts(user_id).await?)
    }

    pub async fn add_contact(
        &self,
        user_id: i32,
        candidate: NewContact,
    ) -> Result<Contact, ContactError> {
        let candidate = sanitize(candidate)?;

        let snapshot = self
            .stores
            .snapshot_for_user(user_id)
            .await?
            .ok_or(ContactError::ProfileNotFound)?;
        let now = Utc::now();
        let plan = snapshot.plan(now);
        let limit = snapshot.contact_limit(now);

        match self
            .stores
            .contacts
            .insert_within_limit(user_id, &candidate, limit)
            .await?
        {
            ContactInsertOutcome::Inserted(contact) => {
                info!(%user_id, contact_id = contact.id, "contact added");
                Ok(contact)
            }
            ContactInsertOutcome::Duplicate => Err(ContactError::DuplicateContact),
            ContactInsertOutcome::LimitReached { existing } => {
                info!(%user_id, existing, limit, %plan, "contact limit reached");
                Err(ContactError::ContactLimitReached { limit, plan })
            }
        }
    }

    pub async fn update_contact(
        &self,
        user_id: i32,
        contact_id: i64,
        patch: ContactUpdate,
    ) -> Result<Contact, ContactError> {
        let current = self
            .stores
            .contacts
            .list_contacts(user_id)
            .await?
            .into_iter()
            .find(|contact| contact.id == contact_id)
            .ok_or(ContactError::NotFound)?;

        let merged = sanitize(NewContact {
            name: patch.name.unwrap_or(current.name),
            phone_number: patch.phone_number.unwrap_or(current.phone_number),
            relationship: patch.relationship.or(current.relationship),
        })?;

        match self
            .stores
            .contacts
            .update_contact(user_id, contact_id, &merged)
            .await?
        {
            ContactUpdateOutcome::Updated(contact) => Ok(contact),
            ContactUpdateOutcome::NotFound => Err(ContactError::NotFound),
            ContactUpdateOutcome::Duplicate => Err(ContactError::DuplicateContact),
        }
    }

    pub async fn remove_contact(&self, user_id: i32, contact_id: i64) -> Result<(), ContactError> {
        if self.stores.contacts.delete_contact(user_id, contact_id).await? {
            info!(%user_id, contact_id, "contact removed");
            Ok(())
        } else {
            Err(ContactError::NotFound)
        }
    }
}

fn sanitize(candidate: NewContact) -> Result<NewContact, ContactError> {
    let phone_number =
        validate_phone(&candidate.phone_number).ok_or(ContactError::InvalidPhoneFormat)?;
    let name = candidate.name.trim();
    if name.is_empty() {
        return Err(ContactError::InvalidName);
    }
    let relationship = candidate
        .relationship
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    Ok(NewContact {
        name: name.to_string(),
        phone_number,
        relationship,
    })
}

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};

use super::models::{Contact, ContactUpdate, NewContact};
use super::service::ContactRegistry;
use crate::error::AppResult;
use crate::extractor::AuthUser;

pub fn routes() -> Router {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/:id",
            patch(update_contact).delete(delete_contact),
        )
}

pub async fn list_contacts(
    Extension(registry): Extension<ContactRegistry>,
    AuthUser { user_id }: AuthUser,
) -> AppResult<Json<Vec<Contact>>> {
    Ok(Json(registry.list_contacts(user_id).await?))
}

pub async fn create_contact(
    Extension(registry): Extension<ContactRegistry>,
    AuthUser { user_id }: AuthUser,
    Json(payload): Json<NewContact>,
) -> AppResult<(StatusCode, Json<Contact>)> {
    let contact = registry.add_contact(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    Extension(registry): Extension<ContactRegistry>,
    AuthUser { user_id }: AuthUser,
    Path(contact_id): Path<i64>,
    Json(payload): Json<ContactUpdate>,
) -> AppResult<Json<Contact>> {
    Ok(Json(
        registry
            .update_contact(user_id, contact_id, payload)
            .await?,
    ))
}

pub async fn delete_contact(
    Extension(registry): Extension<ContactRegistry>,
    AuthUser { user_id }: AuthUser,
    Path(contact_id): Path<i64>,
) -> AppResult<StatusCode> {
    registry.remove_contact(user_id, contact_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub id: i64,
    pub user_id: i32,
    pub name: String,
    pub phone_number: String,
    pub relationship: Option<String>,
}

/// Candidate contact as submitted by the owner.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone_number: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ______________________________________ User ______________________________________

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Credential columns fetched at login.
#[derive(Debug, FromRow)]
pub struct CredentialsRow {
    pub id: String,
    pub password_hash: String,
}

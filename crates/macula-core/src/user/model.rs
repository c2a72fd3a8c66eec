//! User domain models.

use macula_db::queries::users::UserRow;
use serde::{Deserialize, Serialize};

/// A registered clinician. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub title: String,
}

impl User {
    /// Create from database row.
    pub fn from_row(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            name: row.name,
            title: row.title,
        }
    }
}

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub title: String,
}

//! User account queries.

use serde::{Deserialize, Serialize};

use crate::pool::{DbError, DbPool, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRow {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub title: String,
}

pub async fn create_user(pool: &DbPool, row: NewUserRow) -> DbResult<UserRow> {
    if row.username.trim().is_empty() {
        return Err(DbError::Constraint("username is empty".to_string()));
    }
    pool.insert_user(row).await
}

pub async fn get_user(pool: &DbPool, id: u64) -> DbResult<UserRow> {
    pool.get_user(id).await
}

pub async fn get_user_by_username(pool: &DbPool, username: &str) -> DbResult<Option<UserRow>> {
    pool.find_user_by_username(username).await
}

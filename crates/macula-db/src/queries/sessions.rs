//! Login session queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pool::{DbPool, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub token: String,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
}

pub async fn create_session(pool: &DbPool, token: &str, user_id: u64) -> DbResult<SessionRow> {
    let row = SessionRow {
        token: token.to_string(),
        user_id,
        created_at: Utc::now(),
    };
    pool.insert_session(row.clone()).await?;
    Ok(row)
}

pub async fn get_session(pool: &DbPool, token: &str) -> DbResult<Option<SessionRow>> {
    pool.get_session(token).await
}

pub async fn delete_session(pool: &DbPool, token: &str) -> DbResult<bool> {
    pool.delete_session(token).await
}

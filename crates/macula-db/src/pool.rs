//! Storage trait, error types and the shared pool handle.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::queries::analyses::{AnalysisRow, NewAnalysisRow};
use crate::queries::sessions::SessionRow;
use crate::queries::users::{NewUserRow, UserRow};

/// Storage error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

/// Persistence primitives.
///
/// Implementations own every analysis, user and session record. Identifier
/// allocation happens inside the implementation so that concurrent inserts
/// never observe the same id.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert an analysis, assigning the next id and the creation timestamp.
    async fn insert_analysis(&self, row: NewAnalysisRow) -> DbResult<AnalysisRow>;

    async fn get_analysis(&self, id: u64) -> DbResult<AnalysisRow>;

    /// List analyses in creation order. `None` means no owner scoping.
    async fn list_analyses(&self, user_id: Option<u64>) -> DbResult<Vec<AnalysisRow>>;

    /// Insert a user. Usernames are unique.
    async fn insert_user(&self, row: NewUserRow) -> DbResult<UserRow>;

    async fn get_user(&self, id: u64) -> DbResult<UserRow>;

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<UserRow>>;

    async fn insert_session(&self, row: SessionRow) -> DbResult<()>;

    async fn get_session(&self, token: &str) -> DbResult<Option<SessionRow>>;

    /// Remove a session. Returns whether it existed.
    async fn delete_session(&self, token: &str) -> DbResult<bool>;
}

/// Shared handle to the configured store. Clone it freely.
pub type DbPool = Arc<dyn Store>;

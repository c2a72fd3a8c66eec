//! In-memory store.
//!
//! All tables sit behind a single `RwLock`. Ids are allocated while the write
//! lock is held, so id order is creation order.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::pool::{DbError, DbResult, Store};
use crate::queries::analyses::{AnalysisRow, NewAnalysisRow};
use crate::queries::sessions::SessionRow;
use crate::queries::users::{NewUserRow, UserRow};

#[derive(Default)]
struct Tables {
    analyses: BTreeMap<u64, AnalysisRow>,
    users: BTreeMap<u64, UserRow>,
    sessions: HashMap<String, SessionRow>,
    last_analysis_id: u64,
    last_user_id: u64,
}

/// Process-local store. Dropped together with its last `DbPool` handle.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_analysis(&self, row: NewAnalysisRow) -> DbResult<AnalysisRow> {
        let mut tables = self.tables.write().await;
        tables.last_analysis_id += 1;
        let id = tables.last_analysis_id;

        let stored = AnalysisRow {
            id,
            user_id: row.user_id,
            image_data: row.image_data,
            prediction: row.prediction,
            confidence: row.confidence,
            heatmap_data: row.heatmap_data,
            created_at: Utc::now(),
        };
        tables.analyses.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_analysis(&self, id: u64) -> DbResult<AnalysisRow> {
        let tables = self.tables.read().await;
        tables
            .analyses
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Analysis not found: {}", id)))
    }

    async fn list_analyses(&self, user_id: Option<u64>) -> DbResult<Vec<AnalysisRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .analyses
            .values()
            .filter(|a| user_id.is_none() || a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_user(&self, row: NewUserRow) -> DbResult<UserRow> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == row.username) {
            return Err(DbError::Conflict(format!(
                "Username already exists: {}",
                row.username
            )));
        }

        tables.last_user_id += 1;
        let user = UserRow {
            id: tables.last_user_id,
            username: row.username,
            password_hash: row.password_hash,
            name: row.name,
            title: row.title,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: u64) -> DbResult<UserRow> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("User not found: {}", id)))
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_session(&self, row: SessionRow) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&row.user_id) {
            return Err(DbError::Constraint(format!(
                "session refers to unknown user {}",
                row.user_id
            )));
        }
        tables.sessions.insert(row.token.clone(), row);
        Ok(())
    }

    async fn get_session(&self, token: &str) -> DbResult<Option<SessionRow>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.sessions.remove(token).is_some())
    }
}

//! Analysis record queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pool::{DbError, DbPool, DbResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub id: u64,
    pub user_id: Option<u64>,
    pub image_data: String,
    pub prediction: String,
    pub confidence: u8,
    pub heatmap_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A fully-formed analysis that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysisRow {
    pub user_id: Option<u64>,
    pub image_data: String,
    pub prediction: String,
    pub confidence: u8,
    pub heatmap_data: Option<String>,
}

pub async fn create_analysis(pool: &DbPool, row: NewAnalysisRow) -> DbResult<AnalysisRow> {
    if row.image_data.trim().is_empty() {
        return Err(DbError::Constraint("analysis image payload is empty".to_string()));
    }
    if row.prediction.trim().is_empty() {
        return Err(DbError::Constraint("analysis prediction label is empty".to_string()));
    }
    if row.confidence > 100 {
        return Err(DbError::Constraint(format!(
            "analysis confidence {} is above 100",
            row.confidence
        )));
    }

    let created = pool.insert_analysis(row).await?;
    tracing::debug!(id = created.id, user_id = ?created.user_id, "Analysis stored");
    Ok(created)
}

pub async fn get_analysis(pool: &DbPool, id: u64) -> DbResult<AnalysisRow> {
    pool.get_analysis(id).await
}

/// All analyses in creation order.
pub async fn list_analyses(pool: &DbPool) -> DbResult<Vec<AnalysisRow>> {
    pool.list_analyses(None).await
}

/// Analyses owned by `user_id`, in creation order.
pub async fn list_analyses_by_user(pool: &DbPool, user_id: u64) -> DbResult<Vec<AnalysisRow>> {
    pool.list_analyses(Some(user_id)).await
}

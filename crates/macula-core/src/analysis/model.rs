//! Analysis domain models.

use chrono::{DateTime, Utc};
use macula_db::queries::analyses::AnalysisRow;
use serde::{Deserialize, Serialize};

/// The persisted result of one classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: u64,
    pub user_id: Option<u64>,
    pub image_data: String,
    pub prediction: String,
    /// Integer percentage, 0 to 100.
    pub confidence: u8,
    pub heatmap_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    /// Create from database row.
    pub fn from_row(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            image_data: row.image_data,
            prediction: row.prediction,
            confidence: row.confidence,
            heatmap_data: row.heatmap_data,
            created_at: row.created_at,
        }
    }
}

/// Steps of one analyze request. `Failed` is reachable from every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Classified,
    Persisted,
    Responded,
    Failed,
}

impl Stage {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Classified => "classified",
            Self::Persisted => "persisted",
            Self::Responded => "responded",
            Self::Failed => "failed",
        }
    }
}

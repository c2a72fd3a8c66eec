//! Application state.

use chrono::{DateTime, Utc};
use macula_core::analysis::model::Analysis;
use macula_core::analysis::Analyzer;
use macula_db::DbPool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default request body limit, matching the upload form of the web client.
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// WebSocket message types.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WebSocketMessage {
    AnalysisCreated(AnalysisNotice),
}

/// What live clients learn about a new analysis. Image payloads stay out of
/// the feed; clients fetch the record when they need them.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisNotice {
    pub id: u64,
    pub user_id: Option<u64>,
    pub prediction: String,
    pub confidence: u8,
    pub has_heatmap: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Analysis> for AnalysisNotice {
    fn from(analysis: &Analysis) -> Self {
        Self {
            id: analysis.id,
            user_id: analysis.user_id,
            prediction: analysis.prediction.clone(),
            confidence: analysis.confidence,
            has_heatmap: analysis.heatmap_data.is_some(),
            created_at: analysis.created_at,
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub analyzer: Arc<Analyzer>,
    pub auth_required: bool,
    pub credentials_configured: bool,
    pub body_limit: usize,
    pub tx: broadcast::Sender<WebSocketMessage>,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            db: analyzer.pool().clone(),
            analyzer,
            auth_required: false,
            credentials_configured: false,
            body_limit: DEFAULT_BODY_LIMIT,
            tx,
        }
    }

    pub fn with_auth_required(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    pub fn with_credentials_configured(mut self, configured: bool) -> Self {
        self.credentials_configured = configured;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Broadcast a message to all WebSocket clients.
    pub fn broadcast(&self, msg: WebSocketMessage) {
        let _ = self.tx.send(msg);
    }
}

//! Analysis route handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use macula_core::analysis::{self, model::Analysis, model::Stage};
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::MaybeSession;
use crate::error::ApiError;
use crate::state::{AppState, WebSocketMessage};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image_data: String,
}

pub async fn analyze(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Analysis>, ApiError> {
    let owner = session.owner(&state)?;
    let Json(req) = payload?;

    info!(user_id = ?owner, "Starting analysis request");
    let analysis = state
        .analyzer
        .analyze(owner, &req.image_data)
        .await
        .map_err(|e| ApiError::from(e).on_failure("Analysis failed"))?;

    state.broadcast(WebSocketMessage::AnalysisCreated((&analysis).into()));
    debug!(id = analysis.id, state = Stage::Responded.as_str(), "Analysis returned");
    Ok(Json(analysis))
}

pub async fn list_analyses(
    State(state): State<AppState>,
    session: MaybeSession,
) -> Result<Json<Vec<Analysis>>, ApiError> {
    let owner = session.owner(&state)?;
    let analyses = analysis::list_analyses(&state.db, owner).await?;
    Ok(Json(analyses))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    session: MaybeSession,
    Path(id): Path<u64>,
) -> Result<Json<Analysis>, ApiError> {
    let owner = session.owner(&state)?;
    let analysis = analysis::get_analysis(&state.db, id, owner).await?;
    Ok(Json(analysis))
}

//! Account and session route handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use macula_core::user::{
    self,
    model::{NewUser, User},
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let Json(new_user) = payload?;
    let user = user::register(&state.db, new_user).await?;
    let token = user::open_session(&state.db, user.id).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(req) = payload?;
    let (user, token) = user::login(&state.db, &req.username, &req.password).await?;
    Ok(Json(SessionResponse { user, token }))
}

pub async fn logout(State(state): State<AppState>, session: AuthSession) -> Result<StatusCode, ApiError> {
    user::logout(&state.db, &session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(session: AuthSession) -> Json<User> {
    Json(session.user)
}

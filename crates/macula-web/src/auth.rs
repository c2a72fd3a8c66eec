//! Bearer-token session extraction.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use macula_core::user::{self, model::User};

use crate::error::ApiError;
use crate::state::AppState;

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// An authenticated caller. Rejects with 401 when there is no valid session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?
            .to_string();
        let user = user::authenticate(&state.db, &token).await?;
        Ok(Self { user, token })
    }
}

/// A caller that may or may not be signed in.
///
/// A header carrying an unknown token is still rejected; only a missing
/// header yields an anonymous caller.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<AuthSession>);

impl MaybeSession {
    /// Records are scoped to this owner. Anonymous callers are refused when
    /// the server requires authentication.
    pub fn owner(&self, state: &AppState) -> Result<Option<u64>, ApiError> {
        match &self.0 {
            Some(session) => Ok(Some(session.user.id)),
            None if state.auth_required => Err(ApiError::unauthorized("Authentication required")),
            None => Ok(None),
        }
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if bearer_token(&parts.headers).is_none() {
            return Ok(Self(None));
        }
        AuthSession::from_request_parts(parts, state).await.map(|s| Self(Some(s)))
    }
}

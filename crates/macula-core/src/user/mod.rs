//! User accounts and login sessions.

pub mod model;
pub mod password;

use macula_db::queries::{sessions as session_queries, users as queries};
use macula_db::{DbError, DbPool};
use tracing::info;
use uuid::Uuid;

use crate::error::{MaculaError, MaculaResult};
use model::{NewUser, User};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Register a new user.
pub async fn register(pool: &DbPool, new_user: NewUser) -> MaculaResult<User> {
    let username = new_user.username.trim();
    if username.is_empty() {
        return Err(MaculaError::validation("Username is required"));
    }
    if new_user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(MaculaError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if new_user.name.trim().is_empty() || new_user.title.trim().is_empty() {
        return Err(MaculaError::validation("Name and title are required"));
    }

    let row = queries::create_user(
        pool,
        queries::NewUserRow {
            username: username.to_string(),
            password_hash: password::hash_password(&new_user.password),
            name: new_user.name.trim().to_string(),
            title: new_user.title.trim().to_string(),
        },
    )
    .await
    .map_err(|e| match e {
        DbError::Conflict(_) => MaculaError::Conflict("Username already exists".to_string()),
        other => other.into(),
    })?;

    info!(user_id = row.id, "User registered");
    Ok(User::from_row(row))
}

/// Check credentials and open a session. Returns the user and session token.
pub async fn login(pool: &DbPool, username: &str, password: &str) -> MaculaResult<(User, String)> {
    let row = queries::get_user_by_username(pool, username.trim())
        .await?
        .filter(|row| password::verify_password(password, &row.password_hash))
        .ok_or_else(|| MaculaError::unauthorized("Invalid username or password"))?;

    let token = open_session(pool, row.id).await?;
    info!(user_id = row.id, "User logged in");
    Ok((User::from_row(row), token))
}

/// Open a session for an existing user.
pub async fn open_session(pool: &DbPool, user_id: u64) -> MaculaResult<String> {
    let token = Uuid::new_v4().simple().to_string();
    session_queries::create_session(pool, &token, user_id).await?;
    Ok(token)
}

/// Resolve a session token to its user.
pub async fn authenticate(pool: &DbPool, token: &str) -> MaculaResult<User> {
    let session = session_queries::get_session(pool, token)
        .await?
        .ok_or_else(|| MaculaError::unauthorized("Session expired or invalid"))?;

    let row = queries::get_user(pool, session.user_id).await.map_err(|e| match e {
        DbError::NotFound(_) => MaculaError::unauthorized("Session user no longer exists"),
        other => other.into(),
    })?;
    Ok(User::from_row(row))
}

/// Close a session. Unknown tokens are ignored.
pub async fn logout(pool: &DbPool, token: &str) -> MaculaResult<()> {
    if session_queries::delete_session(pool, token).await? {
        info!("User logged out");
    }
    Ok(())
}

//! user account endpoints: registration and credential login.
//!
//! endpoints:
//! - `POST /register` - create an account
//! - `POST /login` - verify email + password
//!
//! login failures are always reported as the same undifferentiated
//! "invalid credentials" - the response never reveals whether the email
//! or the password was wrong.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::AppState;
use crate::handlers::{ApiError, ResultExt};
use aerolog_db::Database;
use aerolog_types::{User, password};

/// request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// desired login name.
    pub username: String,
    /// email address.
    pub email: String,
    /// plaintext password, hashed before storage.
    pub password: String,
}

/// request body for credential login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// account email address.
    pub email: String,
    /// plaintext password.
    pub password: String,
}

/// user representation in api responses. never carries the hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// user id.
    pub id: u64,
    /// login name.
    pub username: String,
    /// email address.
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// check a requested username: 3-32 characters, alphanumeric plus `-` and `_`.
fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::validation(
            "username must be between 3 and 32 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "username may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

/// minimal structural email check - one `@`, non-empty parts, dotted domain.
fn validate_email(email: &str) -> Result<(), ApiError> {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err(ApiError::validation("invalid email address"));
    }
    Ok(())
}

/// POST /register - create a user account.
///
/// usernames and emails are stored lowercase; duplicates (in any case)
/// are rejected with 409.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_username(&request.username)?;
    validate_email(&request.email)?;
    if request.password.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }

    let hash = password::hash(&request.password).map_internal()?;
    let user = User::new(&request.username, &request.email, hash);

    let created = match state.db.create_user(&user).await {
        Ok(created) => created,
        Err(aerolog_db::Error::Conflict) => {
            return Err(ApiError::conflict("username or email already taken"));
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    tracing::info!(user_id = created.id.0, username = %created.username, "user registered");

    Ok(Json(json!({
        "message": "user registered",
        "data": UserResponse::from(&created),
    })))
}

/// POST /login - verify email and password.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = request.email.to_lowercase();

    let user = state.db.get_user_by_email(&email).await.map_internal()?;

    // a missing account and a wrong password produce the same error
    let verified = user
        .as_ref()
        .map(|u| password::verify(&u.password_hash, &request.password))
        .unwrap_or(false);

    if !verified {
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let user = user.ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;

    Ok(Json(json!({
        "message": "login successful",
        "data": UserResponse::from(&user),
    })))
}

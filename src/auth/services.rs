use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{NewUser, User},
    },
    error::ApiError,
    state::AppState,
};

/// Creates a user unless one already holds the email.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, ApiError> {
    let existing = state
        .users
        .find_by_email(&req.email)
        .await
        .map_err(|e| ApiError::internal("Failed to create user", e))?;
    if existing.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal("Failed to create user", e))?
        .map_err(|e| ApiError::internal("Failed to create user", e))?;

    let user = state
        .users
        .create(NewUser {
            name: req.name,
            email: req.email,
            mobile: req.mobile,
            password_hash,
        })
        .await
        .map_err(|e| ApiError::internal("Failed to create user", e))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks credentials and issues a signed token for the matching user.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<String, ApiError> {
    let user = state
        .users
        .find_by_name(&req.name)
        .await
        .map_err(|e| ApiError::internal("Failed to log in", e))?
        .ok_or_else(|| {
            warn!(name = %req.name, "login unknown user");
            ApiError::NotFound("User not found".into())
        })?;

    let password = req.password;
    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal("Failed to log in", e))?
        .map_err(|e| ApiError::internal("Failed to log in", e))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid password".into()));
    }

    let token = JwtKeys::from(&state.config.jwt)
        .sign(user.id)
        .map_err(|e| ApiError::internal("Failed to log in", e))?;

    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

/// Resolves the caller's user id from an `Authorization` header value.
pub fn verify_token(keys: &JwtKeys, authorization: Option<&str>) -> Result<Uuid, ApiError> {
    let header = authorization.ok_or_else(|| ApiError::Forbidden("Token required".into()))?;

    let mut parts = header.split_whitespace();
    let token = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => token,
        _ => return Err(ApiError::Forbidden("Token required".into())),
    };

    match keys.verify(token) {
        Ok(claims) => Ok(claims.sub),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(ApiError::Unauthorized("Invalid token".into()))
        }
    }
}

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::repo_types::{InsertUser, User},
    validation::Validate,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// A freshly issued token together with the user it belongs to.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<Session> {
    req.ensure_valid()?;
    let name = req.name.as_deref().unwrap_or_default().trim();
    let email = req.email.as_deref().unwrap_or_default().trim();
    let password = req.password.as_deref().unwrap_or_default();

    if state.users.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(password)?;
    let user = match state.users.create(name, email, &hash).await? {
        InsertUser::Created(user) => user,
        InsertUser::EmailTaken => {
            warn!(email = %email, "email registered concurrently");
            return Err(AppError::Conflict("Email already registered".into()));
        }
    };

    let token = JwtKeys::from_ref(state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Session { token, user })
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<Session> {
    req.ensure_valid()?;
    let email = req.email.as_deref().unwrap_or_default().trim();
    let password = req.password.as_deref().unwrap_or_default();

    let Some(user) = state.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Auth(INVALID_CREDENTIALS.into()));
    }

    let token = JwtKeys::from_ref(state).sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session { token, user })
}

pub async fn profile(state: &AppState, user_id: Uuid) -> AppResult<User> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

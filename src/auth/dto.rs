use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::{User, UserRole};
use crate::validation::{is_valid_email, required, FieldError, Validate};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, alias = "nama")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "name", &self.name);
        if let Some(email) = required(&mut errors, "email", &self.email) {
            if !is_valid_email(email) {
                errors.push(FieldError::new("email", "Invalid email"));
            }
        }
        // passwords are not trimmed
        match self.password.as_deref() {
            None | Some("") => errors.push(FieldError::new("password", "password is required")),
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.push(FieldError::new(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            )),
            Some(_) => {}
        }
        errors
    }
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        required(&mut errors, "email", &self.email);
        if self.password.as_deref().map_or(true, str::is_empty) {
            errors.push(FieldError::new("password", "password is required"));
        }
        errors
    }
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: User,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserRole,
    pub total_donations: i32,
    pub total_received: i32,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            user_type: u.role,
            total_donations: u.total_donations,
            total_received: u.total_received,
        }
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::password::validate_password_strength;
use crate::auth::repo_types::PublicUser;
use crate::error::AuthError;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AuthError::Validation("email must be an email".into()));
    }
    Ok(email)
}

/// Payload of `auth.register.user`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserRequest {
    /// Normalises the email and applies the field rules.
    pub fn validate(mut self) -> Result<Self, AuthError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(AuthError::Validation("name should not be empty".into()));
        }
        self.email = normalize_email(&self.email)?;
        validate_password_strength(&self.password).map_err(AuthError::Validation)?;
        Ok(self)
    }
}

/// Payload of `auth.login.user`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginUserRequest {
    pub email: String,
    pub password: String,
}

impl LoginUserRequest {
    /// Login only needs a well-formed email and some password; the strength
    /// policy belongs to registration.
    pub fn validate(mut self) -> Result<Self, AuthError> {
        self.email = normalize_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthError::Validation("password should not be empty".into()));
        }
        Ok(self)
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

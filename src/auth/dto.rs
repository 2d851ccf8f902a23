use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::db::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Credentials for login. Read from a JSON body, or from an OAuth2
/// password-grant form (see [`PasswordForm`]).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `application/x-www-form-urlencoded` password grant. `username` carries the
/// email; the remaining OAuth2 fields (`grant_type`, `scope`, ...) are ignored.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub username: String,
    pub password: String,
}

impl From<PasswordForm> for LoginRequest {
    fn from(form: PasswordForm) -> Self {
        Self {
            email: form.username,
            password: form.password,
        }
    }
}

/// Partial self-service update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Returned by login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".into(),
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

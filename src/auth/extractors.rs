use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Form, Json,
};
use tracing::warn;

use super::{
    dto::{LoginRequest, PasswordForm},
    token::{TokenError, TokenIssuer},
};
use crate::{
    db::{Database, User},
    error::AppError,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// Resolves a raw `Authorization` header value to a stored user.
pub async fn authenticate(
    db: &dyn Database,
    tokens: &TokenIssuer,
    authorization: Option<&str>,
) -> Result<User, AppError> {
    let header = authorization
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    // Expect "Bearer <token>"
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    let user_id = tokens.validate(token).map_err(|e| {
        match e {
            TokenError::Expired => warn!("expired token"),
            _ => warn!("invalid token"),
        }
        AppError::Unauthorized(INVALID_CREDENTIALS.into())
    })?;

    let mut uow = db.begin().await?;
    let user = uow.find_user_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id, "token for unknown user");
        AppError::Unauthorized(INVALID_CREDENTIALS.into())
    })?;
    Ok(user)
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Any user holding a valid token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(state.db.as_ref(), &state.tokens, authorization_header(parts)).await?;
        Ok(CurrentUser(user))
    }
}

/// A user holding a valid token whose account is still active.
pub struct ActiveUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            warn!(user_id = user.id, "inactive user rejected");
            return Err(AppError::Forbidden("Inactive user".into()));
        }
        Ok(ActiveUser(user))
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Login credentials from either an OAuth2 password form or a JSON body.
#[async_trait]
impl<S> FromRequest<S> for LoginRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(form) = Form::<PasswordForm>::from_request(req, state).await?;
            return Ok(form.into());
        }
        let Json(body) = Json::<LoginRequest>::from_request(req, state).await?;
        Ok(body)
    }
}

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse, UpdateUserRequest},
        extractors::ActiveUser,
        services,
    },
    error::AppError,
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).put(update_me))
}

#[instrument(skip(state, payload), fields(email = %payload.email, username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let mut uow = state.db.begin().await?;
    let user = services::register(uow.as_mut(), payload).await?;
    uow.commit().await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    payload: LoginRequest,
) -> Result<Json<TokenResponse>, AppError> {
    let mut uow = state.db.begin().await?;
    let token = services::login(uow.as_mut(), &state.tokens, payload).await?;
    Ok(Json(token))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_me(ActiveUser(user): ActiveUser) -> Json<PublicUser> {
    Json(services::get_self(&user))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let mut uow = state.db.begin().await?;
    let user = services::update_self(uow.as_mut(), user, payload).await?;
    uow.commit().await?;
    Ok(Json(user))
}

use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod services;
pub mod token;

pub use dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse, UpdateUserRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}

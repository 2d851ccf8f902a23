mod dto;
pub mod handlers;
pub mod services;
pub mod vocab;

use crate::state::AppState;
use axum::Router;

pub use dto::{CreateTransactionRequest, TransactionQuery, TransactionResponse};

pub fn router() -> Router<AppState> {
    handlers::routes()
}

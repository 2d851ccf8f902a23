use axum::{
    extract::State,
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateTransactionRequest, TransactionQuery, TransactionResponse},
    services,
};
use crate::{
    auth::extractors::ActiveUser,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/", get(list_transactions).post(create_transaction))
        .route("/transactions/:id", get(get_transaction))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn create_transaction(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    AppJson(payload): AppJson<CreateTransactionRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<TransactionResponse>), AppError> {
    let mut uow = state.db.begin().await?;
    let tx = services::create(uow.as_mut(), &user, payload).await?;
    uow.commit().await?;

    let location = format!("/api/v1/transactions/{}", tx.transaction_id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(tx)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_transactions(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    AppQuery(query): AppQuery<TransactionQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let mut uow = state.db.begin().await?;
    let rows = services::list(uow.as_mut(), &user, query).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_transaction(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<TransactionResponse>, AppError> {
    let mut uow = state.db.begin().await?;
    let tx = services::get(uow.as_mut(), &user, id).await?;
    Ok(Json(tx))
}

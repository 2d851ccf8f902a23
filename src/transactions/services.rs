use tracing::{info, warn};

use super::{
    dto::{CreateTransactionRequest, TransactionQuery, TransactionResponse},
    vocab::{ExpenseCategory, TransactionType},
};
use crate::{
    db::{NewTransaction, TransactionFilter, UnitOfWork, User},
    error::AppError,
};

/// Upper bound on one page; larger requests are clamped.
pub const MAX_LIMIT: i64 = 1000;

fn parse_type(raw: &str) -> Result<TransactionType, AppError> {
    raw.parse().map_err(|e: super::vocab::InvalidVariant| {
        warn!(value = raw, "invalid transaction type");
        AppError::BadRequest(e.to_string())
    })
}

fn parse_category(raw: &str) -> Result<ExpenseCategory, AppError> {
    raw.parse().map_err(|e: super::vocab::InvalidVariant| {
        warn!(value = raw, "invalid expense category");
        AppError::BadRequest(e.to_string())
    })
}

/// Empty query values behave like absent ones.
fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}

pub async fn create(
    uow: &mut dyn UnitOfWork,
    user: &User,
    payload: CreateTransactionRequest,
) -> Result<TransactionResponse, AppError> {
    let transaction_type = parse_type(&payload.transaction_type)?;
    // Checked for every type, not only expenses.
    let expense_category = parse_category(&payload.expense_category)?;

    let tx = uow
        .insert_transaction(NewTransaction {
            user_id: user.id,
            amount: payload.amount,
            transaction_type,
            expense_category,
            transaction_date: payload.transaction_date,
            description: payload.description,
        })
        .await?;

    info!(user_id = user.id, transaction_id = tx.id, "transaction created");
    Ok(tx.into())
}

pub async fn list(
    uow: &mut dyn UnitOfWork,
    user: &User,
    query: TransactionQuery,
) -> Result<Vec<TransactionResponse>, AppError> {
    if query.skip < 0 {
        return Err(AppError::BadRequest("skip must not be negative".into()));
    }
    if query.limit < 0 {
        return Err(AppError::BadRequest("limit must not be negative".into()));
    }

    let filter = TransactionFilter {
        transaction_type: non_empty(query.transaction_type.as_deref())
            .map(parse_type)
            .transpose()?,
        expense_category: non_empty(query.expense_category.as_deref())
            .map(parse_category)
            .transpose()?,
        start_date: query.start_date,
        end_date: query.end_date,
        offset: query.skip,
        limit: query.limit.min(MAX_LIMIT),
    };

    let rows = uow.list_transactions(user.id, &filter).await?;
    Ok(rows.into_iter().map(TransactionResponse::from).collect())
}

/// Someone else's transaction is reported exactly like a missing one.
pub async fn get(
    uow: &mut dyn UnitOfWork,
    user: &User,
    transaction_id: i64,
) -> Result<TransactionResponse, AppError> {
    uow.find_transaction(user.id, transaction_id)
        .await?
        .map(TransactionResponse::from)
        .ok_or_else(|| AppError::NotFound("Transaction not found".into()))
}

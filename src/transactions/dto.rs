use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::vocab::{ExpenseCategory, TransactionType};
use crate::db::Transaction;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Vocabulary fields arrive as plain strings so that unknown values can be
/// answered with the list of valid options.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: f64,
    pub transaction_type: String,
    pub expense_category: String,
    #[serde(with = "iso_date")]
    pub transaction_date: Date,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub transaction_type: Option<String>,
    pub expense_category: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
}

fn default_limit() -> i64 {
    100
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            transaction_type: None,
            expense_category: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub expense_category: ExpenseCategory,
    #[serde(with = "iso_date")]
    pub transaction_date: Date,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            transaction_id: t.id,
            user_id: t.user_id,
            amount: t.amount,
            transaction_type: t.transaction_type,
            expense_category: t.expense_category,
            transaction_date: t.transaction_date,
            description: t.description,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

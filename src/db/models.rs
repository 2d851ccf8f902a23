use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::transactions::vocab::{ExpenseCategory, TransactionType};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub hashed_password: String, // Argon2 PHC string
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
}

/// Financial entry owned by exactly one user.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub expense_category: ExpenseCategory,
    pub transaction_date: Date,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub expense_category: ExpenseCategory,
    pub transaction_date: Date,
    pub description: Option<String>,
}

/// Conjunctive filter for listing one user's transactions. Date bounds are
/// inclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub expense_category: Option<ExpenseCategory>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub offset: i64,
    pub limit: i64,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.transaction_type.map_or(true, |t| tx.transaction_type == t)
            && self.expense_category.map_or(true, |c| tx.expense_category == c)
            && self.start_date.map_or(true, |d| tx.transaction_date >= d)
            && self.end_date.map_or(true, |d| tx.transaction_date <= d)
    }
}

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::transactions::vocab::{ExpenseCategory, TransactionType};

use super::{
    Database, NewTransaction, NewUser, StoreError, StoreResult, Transaction, TransactionFilter,
    UnitOfWork, User,
};

const USER_COLUMNS: &str =
    "id, email, username, hashed_password, is_active, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, amount, transaction_type, expense_category, \
     transaction_date, description, created_at, updated_at";

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

struct PgUnitOfWork {
    tx: sqlx::Transaction<'static, Postgres>,
}

/// Raw `transactions` row; the vocabulary columns are plain text in the table.
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    amount: f64,
    transaction_type: String,
    expense_category: String,
    transaction_date: Date,
    description: Option<String>,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            transaction_type: r
                .transaction_type
                .parse::<TransactionType>()
                .with_context(|| format!("transaction {} has a stale type", r.id))?,
            expense_category: r
                .expense_category
                .parse::<ExpenseCategory>()
                .with_context(|| format!("transaction {} has a stale category", r.id))?,
            transaction_date: r.transaction_date,
            description: r.description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// One user's transactions, newest date first. Filters are appended only when
/// present, each as a bound parameter.
fn list_query(user_id: i64, filter: &TransactionFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = "
    ));
    qb.push_bind(user_id);
    if let Some(t) = filter.transaction_type {
        qb.push(" AND transaction_type = ").push_bind(t.as_str());
    }
    if let Some(c) = filter.expense_category {
        qb.push(" AND expense_category = ").push_bind(c.as_str());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND transaction_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND transaction_date <= ").push_bind(end);
    }
    qb.push(" ORDER BY transaction_date DESC, id DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);
    qb
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("username") => "username",
                _ => "email",
            };
            return StoreError::UniqueViolation { field };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_user_by_id(&mut self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn insert_user(&mut self, user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, hashed_password, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = $2, username = $3, hashed_password = $4, is_active = $5,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(user.is_active)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(user)
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions
                (user_id, amount, transaction_type, expense_category, transaction_date, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(tx.user_id)
        .bind(tx.amount)
        .bind(tx.transaction_type.as_str())
        .bind(tx.expense_category.as_str())
        .bind(tx.transaction_date)
        .bind(&tx.description)
        .fetch_one(&mut *self.tx)
        .await?;
        row.try_into()
    }

    async fn list_transactions(
        &mut self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>> {
        let mut qb = list_query(user_id, filter);
        debug!(sql = qb.sql(), "list transactions");
        let rows = qb
            .build_query_as::<TransactionRow>()
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn find_transaction(&mut self, user_id: i64, id: i64) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }
}

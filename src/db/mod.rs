//! Persistence boundary. Services talk to a [`UnitOfWork`] opened per request;
//! dropping one without calling [`UnitOfWork::commit`] rolls it back.
use async_trait::async_trait;

pub mod memory;
mod models;
pub mod postgres;

pub use models::{NewTransaction, NewUser, Transaction, TransactionFilter, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. `field` names the column.
    #[error("duplicate value for unique field {field}")]
    UniqueViolation { field: &'static str },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One transactional scope over the user and transaction tables.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_user_by_id(&mut self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&mut self, user: NewUser) -> StoreResult<User>;
    /// Writes every mutable column of `user` and stamps `updated_at`.
    async fn update_user(&mut self, user: &User) -> StoreResult<User>;

    async fn insert_transaction(&mut self, tx: NewTransaction) -> StoreResult<Transaction>;
    /// Newest `transaction_date` first, ties broken by descending id.
    async fn list_transactions(
        &mut self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>>;
    async fn find_transaction(&mut self, user_id: i64, id: i64) -> StoreResult<Option<Transaction>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

//! Process-local store used by `AppState::fake()`, `DATABASE_URL=memory://`
//! and the test suites. Units of work are serialized behind one lock; writes
//! are staged on a copy and published on commit.
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    Database, NewTransaction, NewUser, StoreError, StoreResult, Transaction, TransactionFilter,
    UnitOfWork, User,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    transactions: Vec<Transaction>,
    next_user_id: i64,
    next_transaction_id: i64,
}

impl Tables {
    fn check_unique(&self, id: Option<i64>, email: &str, username: &str) -> StoreResult<()> {
        let mut others = self.users.iter().filter(|u| Some(u.id) != id);
        if others.clone().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation { field: "email" });
        }
        if others.any(|u| u.username == username) {
            return Err(StoreError::UniqueViolation { field: "username" });
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_user_by_id(&mut self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.staged.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.staged.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .staged
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> StoreResult<User> {
        self.staged.check_unique(None, &user.email, &user.username)?;
        self.staged.next_user_id += 1;
        let user = User {
            id: self.staged.next_user_id,
            email: user.email,
            username: user.username,
            hashed_password: user.hashed_password,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        self.staged.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<User> {
        self.staged
            .check_unique(Some(user.id), &user.email, &user.username)?;
        let stored = self
            .staged
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| anyhow::anyhow!("user {} does not exist", user.id))?;
        stored.email = user.email.clone();
        stored.username = user.username.clone();
        stored.hashed_password = user.hashed_password.clone();
        stored.is_active = user.is_active;
        stored.updated_at = Some(OffsetDateTime::now_utc());
        Ok(stored.clone())
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> StoreResult<Transaction> {
        if !self.staged.users.iter().any(|u| u.id == tx.user_id) {
            return Err(anyhow::anyhow!("user {} does not exist", tx.user_id).into());
        }
        self.staged.next_transaction_id += 1;
        let tx = Transaction {
            id: self.staged.next_transaction_id,
            user_id: tx.user_id,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            expense_category: tx.expense_category,
            transaction_date: tx.transaction_date,
            description: tx.description,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        self.staged.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn list_transactions(
        &mut self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .staged
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id && filter.matches(t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn find_transaction(&mut self, user_id: i64, id: i64) -> StoreResult<Option<Transaction>> {
        Ok(self
            .staged
            .transactions
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

//! # Repository Module
//!
//! Database repository implementations for the GLOW ledger.
//!
//! ## Ledger vs. Plain Repositories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Ledger repositories (multi-row transactions, retried on conflict)     │
//! │  ├── SaleRepository::record_sale          sale + items + stock +       │
//! │  │                                        customer due + payment       │
//! │  ├── PaymentRepository::record_payment    payment + sale + customer    │
//! │  └── AssignmentRepository::assign         flip pending + insert        │
//! │                                                                         │
//! │  Plain repositories (single-row CRUD)                                  │
//! │  ├── ProductRepository     (stock is read-only here)                   │
//! │  ├── CustomerRepository    (total_due is read-only here)               │
//! │  ├── UserRepository        (also the default IdentityResolver)         │
//! │  ├── ExpenseRepository                                                 │
//! │  └── WorkerTaskRepository                                              │
//! │                                                                         │
//! │  Stock and balance mutations are crate-private helpers that take the   │
//! │  open transaction's connection, so they can only run inside a ledger   │
//! │  transaction.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod assignment;
pub mod customer;
pub mod expense;
pub mod payment;
pub mod product;
pub mod sale;
pub mod user;
pub mod worker_task;

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use glow_core::UNKNOWN_USER_NAME;

use crate::error::DbResult;
use crate::retry::RetryPolicy;
use crate::services::{Clock, IdentityResolver};

/// Shared handles for repositories that run ledger transactions.
#[derive(Clone)]
pub(crate) struct LedgerContext {
    pub pool: SqlitePool,
    pub clock: Arc<dyn Clock>,
    pub identity: Arc<dyn IdentityResolver>,
    pub retry: RetryPolicy,
}

impl LedgerContext {
    /// Display name for `uid`, or `"N/A"` when the directory has none.
    pub async fn display_name(&self, uid: &str) -> DbResult<String> {
        match self.identity.resolve_user_name(uid).await? {
            Some(name) => Ok(name),
            None => {
                warn!(uid = %uid, "No display name for user, using placeholder");
                Ok(UNKNOWN_USER_NAME.to_string())
            }
        }
    }
}
